//! Run model: segments, the timing state machine, and observer views
//!
//! - `Segment` - stored comparison data for one checkpoint
//! - `Run` - the state machine driving an attempt
//! - `RunEvent` - change notifications queued by the run
//! - `RunDefinition` / `RunSnapshot` - serializable views for import and display

mod events;
mod machine;
mod segment;
mod state;

pub use events::RunEvent;
pub use machine::Run;
pub use segment::Segment;
pub use state::{RunState, TimeKind};

use serde::{Deserialize, Serialize};

use crate::time::TimeValue;
use crate::Result;

/// Name and segments of a run, without any attempt state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl RunDefinition {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Run {
    /// Build a READY run from a definition
    pub fn from_definition(definition: RunDefinition) -> Self {
        Run::with_segments(definition.name, definition.segments)
    }

    /// Export the run's name and segments
    pub fn definition(&self) -> RunDefinition {
        RunDefinition {
            name: self.name().to_string(),
            segments: self.segments().to_vec(),
        }
    }

    /// Capture everything an observer needs to render the run
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot::capture(self)
    }
}

/// Per-segment view for observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentSnapshot {
    pub name: String,
    pub live: TimeValue,
    pub comparison: TimeValue,
    pub delta: TimeValue,
    pub best: TimeValue,
    pub is_better: bool,
    pub is_best: bool,
}

/// Point-in-time view of a run (serializable for FFI)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSnapshot {
    pub name: String,
    pub state: RunState,
    pub current_index: usize,
    pub previous_index: Option<usize>,
    pub attempts: u32,
    pub completed: u32,
    pub live_total: TimeValue,
    pub comparison_total: TimeValue,
    pub best_total: TimeValue,
    pub segments: Vec<SegmentSnapshot>,
}

impl RunSnapshot {
    pub fn capture(run: &Run) -> Self {
        let segments = run
            .segments()
            .iter()
            .enumerate()
            .map(|(i, segment)| SegmentSnapshot {
                name: segment.name.clone(),
                live: run.time(i, TimeKind::Live),
                comparison: run.time(i, TimeKind::Comparison),
                delta: run.time(i, TimeKind::Delta),
                best: run.time(i, TimeKind::Best),
                is_better: run.is_better_segment(i),
                is_best: run.is_best_segment(i),
            })
            .collect();

        Self {
            name: run.name().to_string(),
            state: run.state(),
            current_index: run.current_index(),
            previous_index: run.previous_index(),
            attempts: run.attempts(),
            completed: run.completed(),
            live_total: run.total(TimeKind::Live),
            comparison_total: run.total(TimeKind::Comparison),
            best_total: run.total(TimeKind::Best),
            segments,
        }
    }
}
