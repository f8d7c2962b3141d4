//! Control actions shared by manual input and the autosplit protocol

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// A control action applied to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    DoNothing,
    Start,
    Split,
    Unsplit,
    Pause,
    Resume,
    Reset,
    End,
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "do_nothing" | "nothing" | "none" => Ok(Action::DoNothing),
            "start" => Ok(Action::Start),
            "split" => Ok(Action::Split),
            "unsplit" | "undo" => Ok(Action::Unsplit),
            "pause" => Ok(Action::Pause),
            "resume" => Ok(Action::Resume),
            "reset" => Ok(Action::Reset),
            "end" | "stop" => Ok(Action::End),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// Where a control event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Hotkey or menu
    Manual,
    /// Autosplit connection
    Network,
}

/// An action together with the timestamp it happened at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub action: Action,
    pub timestamp: Timestamp,
    pub source: Source,
}

impl ControlEvent {
    /// Create an event from manual input
    pub fn manual(action: Action, timestamp: Timestamp) -> Self {
        Self {
            action,
            timestamp,
            source: Source::Manual,
        }
    }

    /// Create an event from the autosplit connection
    pub fn network(action: Action, timestamp: Timestamp) -> Self {
        Self {
            action,
            timestamp,
            source: Source::Network,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.action == Action::DoNothing
    }
}
