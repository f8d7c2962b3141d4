//! Error types for the timer core

use thiserror::Error;

use crate::run::RunState;

/// Result type for timer operations
pub type Result<T> = std::result::Result<T, TimerError>;

/// Errors surfaced by the timer core.
///
/// Malformed protocol lines and transitions requested from the wrong state
/// are never errors; they are absorbed as no-ops by the codec and the run.
#[derive(Debug, Error)]
pub enum TimerError {
    /// One side of a time comparison was unknown
    #[error("cannot compare an unknown time")]
    InvalidComparison,

    /// Text could not be parsed as a time
    #[error("invalid time '{0}'")]
    InvalidTime(String),

    /// Structural edit requested while an attempt is active or concluded
    #[error("run can only be edited while ready (current state: {0:?})")]
    NotEditable(RunState),

    /// Segment index outside the run
    #[error("segment index {index} out of range for run of {len} segments")]
    SegmentOutOfRange { index: usize, len: usize },

    /// The autosplit listener is already running
    #[error("autosplit listener already running")]
    AlreadyRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            TimerError::InvalidComparison.to_string(),
            "cannot compare an unknown time"
        );
        assert_eq!(
            TimerError::InvalidTime("1:xx".into()).to_string(),
            "invalid time '1:xx'"
        );

        let err = TimerError::SegmentOutOfRange { index: 4, len: 3 };
        assert!(err.to_string().contains("index 4"));
        assert!(err.to_string().contains("3 segments"));
    }

    #[test]
    fn test_not_editable_names_state() {
        let err = TimerError::NotEditable(RunState::Ongoing);
        assert!(err.to_string().contains("Ongoing"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: TimerError = io.into();
        assert!(matches!(err, TimerError::Io(_)));
    }
}
