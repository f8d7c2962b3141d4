//! Run lifecycle states and time kinds

use serde::{Deserialize, Serialize};

/// State of the run timing state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No attempt active; segments may be edited
    #[default]
    Ready,
    /// Attempt in progress, clock running
    Ongoing,
    /// Attempt suspended, clock frozen
    Paused,
    /// Attempt concluded; terminal until reset
    Stopped,
}

impl RunState {
    /// Whether an attempt is in progress (running or paused)
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Ongoing | RunState::Paused)
    }

    /// Whether structural edits are allowed
    pub fn is_editable(&self) -> bool {
        *self == RunState::Ready
    }
}

/// Which time of a segment (or of the whole run) to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeKind {
    /// Cumulative live time of the current attempt
    Live,
    /// Cumulative personal best time
    Comparison,
    /// Live minus comparison
    Delta,
    /// Gold (best individual duration)
    Best,
    /// Individual live duration of the segment
    LiveSegment,
    /// Individual duration of the segment in the personal best
    ComparisonSegment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ready() {
        assert_eq!(RunState::default(), RunState::Ready);
    }

    #[test]
    fn test_state_predicates() {
        assert!(RunState::Ready.is_editable());
        assert!(!RunState::Ready.is_active());
        assert!(RunState::Ongoing.is_active());
        assert!(RunState::Paused.is_active());
        assert!(!RunState::Paused.is_editable());
        assert!(!RunState::Stopped.is_active());
        assert!(!RunState::Stopped.is_editable());
    }

    #[test]
    fn test_serialization() {
        assert_eq!(serde_json::to_string(&RunState::Ongoing).unwrap(), "\"ongoing\"");
        assert_eq!(
            serde_json::to_string(&TimeKind::ComparisonSegment).unwrap(),
            "\"comparison_segment\""
        );
    }
}
