//! Segment comparison data

use serde::{Deserialize, Serialize};

use crate::time::TimeValue;

/// One checkpoint of a run.
///
/// Holds only stored comparison data; live times for the current attempt are
/// kept by the run itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Display name (e.g., "Iudex Gundyr")
    pub name: String,
    /// Cumulative time at this checkpoint in the personal best, unknown if none
    #[serde(default = "unknown_time")]
    pub comparison_time: TimeValue,
    /// Fastest individual duration ever recorded (gold), unknown if none
    #[serde(default = "unknown_time")]
    pub best_duration: TimeValue,
}

fn unknown_time() -> TimeValue {
    TimeValue::UNKNOWN
}

impl Segment {
    /// Create a segment with no comparison data
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comparison_time: TimeValue::UNKNOWN,
            best_duration: TimeValue::UNKNOWN,
        }
    }

    /// Set the stored comparison time
    pub fn with_comparison(mut self, time: TimeValue) -> Self {
        self.comparison_time = time;
        self
    }

    /// Set the stored gold duration
    pub fn with_best(mut self, time: TimeValue) -> Self {
        self.best_duration = time;
        self
    }

    pub fn has_comparison(&self) -> bool {
        self.comparison_time.is_known()
    }

    pub fn has_best(&self) -> bool {
        self.best_duration.is_known()
    }
}
