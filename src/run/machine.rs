//! Run timing and comparison state machine

use std::ops::Range;

use super::events::RunEvent;
use super::segment::Segment;
use super::state::{RunState, TimeKind};
use crate::time::{TimeValue, Timestamp};
use crate::{Result, TimerError};

/// An ordered list of segments plus the state of the current attempt.
///
/// Every transition takes the timestamp of the event that triggered it and
/// never samples a clock, so manual and network input go through the same
/// code path. Transitions requested from a state that does not accept them
/// are no-ops.
#[derive(Debug, Clone)]
pub struct Run {
    name: String,
    segments: Vec<Segment>,
    state: RunState,
    current: usize,
    previous: Option<usize>,
    /// Cumulative live time per segment, known only below `current`
    live: Vec<TimeValue>,
    /// Gold a split of this attempt replaced, restored on unsplit
    replaced_best: Vec<Option<TimeValue>>,
    start_reference: Timestamp,
    paused_accumulated: i64,
    pause_reference: Option<Timestamp>,
    last_resume_reference: Timestamp,
    attempts: u32,
    completed: u32,
    events: Vec<RunEvent>,
}

impl Run {
    /// Create an empty run
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_segments(name, Vec::new())
    }

    /// Create a run from existing segments
    pub fn with_segments(name: impl Into<String>, segments: Vec<Segment>) -> Self {
        let len = segments.len();
        Self {
            name: name.into(),
            segments,
            state: RunState::Ready,
            current: 0,
            previous: None,
            live: vec![TimeValue::UNKNOWN; len],
            replaced_best: vec![None; len],
            start_reference: 0,
            paused_accumulated: 0,
            pause_reference: None,
            last_resume_reference: 0,
            attempts: 0,
            completed: 0,
            events: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Index of the segment being run (equals `len()` once the run is complete)
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Index of the most recently split segment
    pub fn previous_index(&self) -> Option<usize> {
        self.previous
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of attempts started
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of attempts that reached the final split
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Drain queued change notifications
    pub fn take_events(&mut self) -> Vec<RunEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Begin a new attempt
    pub fn start(&mut self, timestamp: Timestamp) {
        if self.state != RunState::Ready || self.segments.is_empty() {
            self.ignored("start");
            return;
        }

        self.start_reference = timestamp;
        self.last_resume_reference = timestamp;
        self.paused_accumulated = 0;
        self.pause_reference = None;
        self.clear_live();
        self.set_indices(0, None);
        self.attempts += 1;
        self.set_state(RunState::Ongoing);

        log::info!(
            "Attempt #{} of '{}' started ({} segments)",
            self.attempts,
            self.name,
            self.segments.len()
        );
    }

    /// Record the current segment and move to the next one.
    ///
    /// Splitting the final segment stops the run and runs the personal best
    /// commit check.
    pub fn split(&mut self, timestamp: Timestamp) {
        if self.state != RunState::Ongoing {
            self.ignored("split");
            return;
        }

        let index = self.current;
        let floor = match index {
            0 => TimeValue::ZERO,
            _ => self.live[index - 1],
        };
        let elapsed = TimeValue::from_nanos(
            timestamp
                .saturating_sub(self.start_reference)
                .saturating_sub(self.paused_accumulated),
        );
        // Out-of-order timestamps never make live times decrease
        self.live[index] = if elapsed.is_less_than(&floor) {
            floor
        } else {
            elapsed
        };
        self.update_best(index);
        self.events.push(RunEvent::SegmentsChanged {
            range: index..index + 1,
        });

        log::debug!(
            "Split '{}' at {}",
            self.segments[index].name,
            self.live[index]
        );

        self.set_indices(index + 1, Some(index));

        if self.current == self.segments.len() {
            self.completed += 1;
            self.set_state(RunState::Stopped);
            log::info!("Attempt finished in {}", self.live[index]);
            self.commit_check();
        }
    }

    /// Undo the most recent split of the running attempt
    pub fn unsplit(&mut self) {
        if self.state != RunState::Ongoing || self.current == 0 {
            self.ignored("unsplit");
            return;
        }

        let index = self.current - 1;
        self.live[index] = TimeValue::UNKNOWN;
        if let Some(best) = self.replaced_best[index].take() {
            self.segments[index].best_duration = best;
        }
        self.events.push(RunEvent::SegmentsChanged {
            range: index..index + 1,
        });
        self.set_indices(index, index.checked_sub(1));
    }

    /// Freeze the clock
    pub fn pause(&mut self, timestamp: Timestamp) {
        if self.state != RunState::Ongoing {
            self.ignored("pause");
            return;
        }

        self.pause_reference = Some(timestamp);
        self.set_state(RunState::Paused);
    }

    /// Unfreeze the clock; the paused interval is excluded from live times
    pub fn resume(&mut self, timestamp: Timestamp) {
        if self.state != RunState::Paused {
            self.ignored("resume");
            return;
        }

        if let Some(paused_at) = self.pause_reference.take() {
            self.paused_accumulated = self
                .paused_accumulated
                .saturating_add(timestamp.saturating_sub(paused_at).max(0));
        }
        self.last_resume_reference = timestamp;
        self.set_state(RunState::Ongoing);
    }

    /// Conclude the attempt early. Partial attempts never become a personal best.
    pub fn end(&mut self) {
        if !self.state.is_active() {
            self.ignored("end");
            return;
        }

        self.set_state(RunState::Stopped);
        log::info!("Attempt ended at segment {}", self.current);
    }

    /// Discard the attempt and return to READY. Comparison data is untouched.
    pub fn reset(&mut self) {
        let had_live = self.live.iter().any(TimeValue::is_known);

        self.clear_live();
        self.pause_reference = None;
        self.set_indices(0, None);
        if had_live {
            self.events.push(RunEvent::SegmentsChanged {
                range: 0..self.segments.len(),
            });
        }
        self.set_state(RunState::Ready);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Clock value for display at `now`
    pub fn elapsed(&self, now: Timestamp) -> TimeValue {
        let since_start = |at: Timestamp| {
            TimeValue::from_nanos(
                at.saturating_sub(self.start_reference)
                    .saturating_sub(self.paused_accumulated),
            )
        };

        match self.state {
            RunState::Ready => TimeValue::UNKNOWN,
            RunState::Ongoing => since_start(now),
            RunState::Paused => since_start(self.pause_reference.unwrap_or(now)),
            RunState::Stopped => self
                .previous
                .map_or(TimeValue::UNKNOWN, |index| self.live[index]),
        }
    }

    /// Cumulative live time at a segment
    pub fn live_time(&self, index: usize) -> TimeValue {
        self.live.get(index).copied().unwrap_or(TimeValue::UNKNOWN)
    }

    /// Individual live duration of a segment
    pub fn live_segment_duration(&self, index: usize) -> TimeValue {
        match index {
            0 => self.live_time(0),
            _ => self.live_time(index) - self.live_time(index - 1),
        }
    }

    /// Individual duration of a segment in the personal best
    pub fn comparison_segment_duration(&self, index: usize) -> TimeValue {
        let comparison = |i: usize| {
            self.segments
                .get(i)
                .map_or(TimeValue::UNKNOWN, |s| s.comparison_time)
        };
        match index {
            0 => comparison(0),
            _ => comparison(index) - comparison(index - 1),
        }
    }

    /// Live minus comparison cumulative time
    pub fn delta(&self, index: usize) -> TimeValue {
        match self.segments.get(index) {
            Some(segment) => self.live_time(index) - segment.comparison_time,
            None => TimeValue::UNKNOWN,
        }
    }

    /// Whether the segment was run faster than in the personal best
    pub fn is_better_segment(&self, index: usize) -> bool {
        self.live_segment_duration(index)
            .is_less_than(&self.comparison_segment_duration(index))
    }

    /// Whether the segment matched or beat the gold
    pub fn is_best_segment(&self, index: usize) -> bool {
        match self.segments.get(index) {
            Some(segment) => self
                .live_segment_duration(index)
                .is_at_most(&segment.best_duration),
            None => false,
        }
    }

    /// Time of a segment by kind
    pub fn time(&self, index: usize, kind: TimeKind) -> TimeValue {
        let Some(segment) = self.segments.get(index) else {
            return TimeValue::UNKNOWN;
        };

        match kind {
            TimeKind::Live => self.live_time(index),
            TimeKind::Comparison => segment.comparison_time,
            TimeKind::Delta => self.delta(index),
            TimeKind::Best => segment.best_duration,
            TimeKind::LiveSegment => self.live_segment_duration(index),
            TimeKind::ComparisonSegment => self.comparison_segment_duration(index),
        }
    }

    /// Run-level time by kind.
    ///
    /// Live and delta read the most recent split, comparison reads the final
    /// segment, and `Best` is the sum of all golds.
    pub fn total(&self, kind: TimeKind) -> TimeValue {
        let Some(last) = self.segments.len().checked_sub(1) else {
            return TimeValue::UNKNOWN;
        };

        match kind {
            TimeKind::Live | TimeKind::LiveSegment => self
                .previous
                .map_or(TimeValue::UNKNOWN, |i| self.live_time(i)),
            TimeKind::Comparison | TimeKind::ComparisonSegment => {
                self.segments[last].comparison_time
            }
            TimeKind::Delta => self.previous.map_or(TimeValue::UNKNOWN, |i| self.delta(i)),
            TimeKind::Best => self
                .segments
                .iter()
                .fold(TimeValue::ZERO, |sum, s| sum + s.best_duration),
        }
    }

    // =========================================================================
    // Editing (READY only)
    // =========================================================================

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.ensure_editable()?;
        self.name = name.into();
        Ok(())
    }

    pub fn add_segment(&mut self, segment: Segment) -> Result<()> {
        let len = self.segments.len();
        self.insert_segment(len, segment)
    }

    pub fn insert_segment(&mut self, index: usize, segment: Segment) -> Result<()> {
        self.ensure_editable()?;
        if index > self.segments.len() {
            return Err(self.out_of_range(index));
        }

        self.segments.insert(index, segment);
        self.live.insert(index, TimeValue::UNKNOWN);
        self.replaced_best.insert(index, None);
        self.events.push(RunEvent::SegmentsChanged {
            range: index..self.segments.len(),
        });
        Ok(())
    }

    pub fn remove_segment(&mut self, index: usize) -> Result<Segment> {
        self.ensure_editable()?;
        self.check_index(index)?;

        let segment = self.segments.remove(index);
        self.live.remove(index);
        self.replaced_best.remove(index);
        self.events.push(RunEvent::SegmentsChanged {
            range: index..self.segments.len(),
        });
        Ok(segment)
    }

    /// Move a segment to another position, shifting the ones in between
    pub fn move_segment(&mut self, from: usize, to: usize) -> Result<()> {
        self.ensure_editable()?;
        self.check_index(from)?;
        self.check_index(to)?;

        let segment = self.segments.remove(from);
        self.segments.insert(to, segment);
        self.events.push(RunEvent::SegmentsChanged {
            range: from.min(to)..from.max(to) + 1,
        });
        Ok(())
    }

    pub fn set_segment_name(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        self.edit_segment(index, |segment| segment.name = name.into())
    }

    pub fn set_comparison_time(&mut self, index: usize, time: TimeValue) -> Result<()> {
        self.edit_segment(index, |segment| segment.comparison_time = time)
    }

    pub fn set_best_duration(&mut self, index: usize, time: TimeValue) -> Result<()> {
        self.edit_segment(index, |segment| segment.best_duration = time)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn edit_segment(&mut self, index: usize, edit: impl FnOnce(&mut Segment)) -> Result<()> {
        self.ensure_editable()?;
        self.check_index(index)?;
        edit(&mut self.segments[index]);
        self.events.push(RunEvent::SegmentsChanged {
            range: index..index + 1,
        });
        Ok(())
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.state.is_editable() {
            Ok(())
        } else {
            Err(TimerError::NotEditable(self.state))
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.segments.len() {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> TimerError {
        TimerError::SegmentOutOfRange {
            index,
            len: self.segments.len(),
        }
    }

    fn ignored(&self, action: &str) {
        log::debug!("Ignoring {} while {:?}", action, self.state);
    }

    fn set_state(&mut self, to: RunState) {
        let from = self.state;
        if from != to {
            self.state = to;
            self.events.push(RunEvent::StateChanged { from, to });
        }
    }

    fn set_indices(&mut self, current: usize, previous: Option<usize>) {
        if self.current != current || self.previous != previous {
            self.current = current;
            self.previous = previous;
            self.events.push(RunEvent::CurrentIndexChanged { current, previous });
        }
    }

    fn clear_live(&mut self) {
        self.live.fill(TimeValue::UNKNOWN);
        self.replaced_best.fill(None);
    }

    /// Record a new gold for a segment that was just split
    fn update_best(&mut self, index: usize) {
        let duration = self.live_segment_duration(index);
        let segment = &mut self.segments[index];

        if duration.is_known()
            && (segment.best_duration.is_unknown()
                || duration.is_less_than(&segment.best_duration))
        {
            self.replaced_best[index] = Some(segment.best_duration);
            segment.best_duration = duration;
            log::debug!("New best segment for '{}': {}", segment.name, duration);
        }
    }

    /// Commit the finished attempt as the comparison if it improved on it.
    ///
    /// Applied to every segment in one pass or not at all.
    fn commit_check(&mut self) {
        let Some(last) = self.segments.len().checked_sub(1) else {
            return;
        };
        let total = self.live[last];
        let prior = self.segments[last].comparison_time;

        if prior.is_known() && !total.is_less_than(&prior) {
            log::info!("No personal best: {} against {}", total, prior);
            return;
        }

        for (segment, live) in self.segments.iter_mut().zip(&self.live) {
            segment.comparison_time = *live;
        }
        let range = self.full_range();
        self.events.push(RunEvent::SegmentsChanged { range });
        self.events.push(RunEvent::PersonalBest { total });
        log::info!("New personal best: {}", total);
    }

    fn full_range(&self) -> Range<usize> {
        0..self.segments.len()
    }
}

impl Default for Run {
    fn default() -> Self {
        Self::new("")
    }
}
