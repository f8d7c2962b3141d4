//! Change notifications emitted by the run

use serde::Serialize;
use std::ops::Range;

use super::state::RunState;
use crate::time::TimeValue;

/// Something observable changed in the run.
///
/// The run queues these as transitions apply; the dispatcher drains and
/// forwards them to subscribers in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    StateChanged { from: RunState, to: RunState },
    CurrentIndexChanged {
        current: usize,
        previous: Option<usize>,
    },
    /// Segment data changed for the given index range
    SegmentsChanged { range: Range<usize> },
    /// A completed attempt was committed as the new comparison
    PersonalBest { total: TimeValue },
}
