//! Nanosecond time values with an explicit unknown state
//!
//! `TimeValue` is the unit every run time is expressed in. Unknown is a real
//! state, distinct from zero: a segment that has not been split yet has an
//! unknown live time, and arithmetic with it stays unknown.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use std::time::Instant;

use crate::config::FormatConfig;
use crate::{Result, TimerError};

/// Opaque monotonic counter in nanoseconds, supplied with every transition.
///
/// Only differences between timestamps are meaningful.
pub type Timestamp = i64;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// Rendering of an unknown time
pub const UNKNOWN_TEXT: &str = "-";

/// A signed nanosecond duration, or unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeValue {
    nanos: Option<i64>,
}

impl TimeValue {
    pub const UNKNOWN: TimeValue = TimeValue { nanos: None };
    pub const ZERO: TimeValue = TimeValue { nanos: Some(0) };

    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos: Some(nanos) }
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self {
            nanos: Some(millis * 1_000_000),
        }
    }

    /// Nanosecond count, `None` when unknown
    pub fn nanos(&self) -> Option<i64> {
        self.nanos
    }

    pub fn is_unknown(&self) -> bool {
        self.nanos.is_none()
    }

    pub fn is_known(&self) -> bool {
        self.nanos.is_some()
    }

    /// Sum of two times; unknown if either side is unknown or the sum overflows
    pub fn add(self, other: TimeValue) -> TimeValue {
        match (self.nanos, other.nanos) {
            (Some(a), Some(b)) => TimeValue {
                nanos: a.checked_add(b),
            },
            _ => TimeValue::UNKNOWN,
        }
    }

    /// Difference of two times; unknown if either side is unknown or it overflows
    pub fn subtract(self, other: TimeValue) -> TimeValue {
        match (self.nanos, other.nanos) {
            (Some(a), Some(b)) => TimeValue {
                nanos: a.checked_sub(b),
            },
            _ => TimeValue::UNKNOWN,
        }
    }

    /// Order two known times
    pub fn compare(&self, other: &TimeValue) -> Result<Ordering> {
        match (self.nanos, other.nanos) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            _ => Err(TimerError::InvalidComparison),
        }
    }

    /// `true` only when both times are known and `self < other`
    pub fn is_less_than(&self, other: &TimeValue) -> bool {
        matches!(self.compare(other), Ok(Ordering::Less))
    }

    /// `true` only when both times are known and `self <= other`
    pub fn is_at_most(&self, other: &TimeValue) -> bool {
        matches!(self.compare(other), Ok(Ordering::Less | Ordering::Equal))
    }

    /// Render as `h:mm:ss.fraction`.
    ///
    /// With `signed`, non-negative values get a leading `+` (delta display).
    /// Values are truncated toward zero to the configured accuracy.
    pub fn format(&self, signed: bool, config: &FormatConfig) -> String {
        let Some(nanos) = self.nanos else {
            return UNKNOWN_TEXT.to_string();
        };

        let unit = config.accuracy.unit_nanos();
        let magnitude = nanos.unsigned_abs() / unit as u64 * unit as u64;

        let sign = if nanos < 0 && magnitude > 0 {
            "-"
        } else if signed {
            "+"
        } else {
            ""
        };

        let hours = magnitude / NANOS_PER_HOUR as u64;
        let minutes = magnitude % NANOS_PER_HOUR as u64 / NANOS_PER_MINUTE as u64;
        let seconds = magnitude % NANOS_PER_MINUTE as u64 / NANOS_PER_SECOND as u64;
        let fraction = magnitude % NANOS_PER_SECOND as u64 / unit as u64;
        let width = config.accuracy.digits() as usize;

        if !config.compact {
            format!(
                "{}{}:{:02}:{:02}.{:0width$}",
                sign, hours, minutes, seconds, fraction
            )
        } else if hours > 0 {
            format!(
                "{}{}:{:02}:{:02}.{:0width$}",
                sign, hours, minutes, seconds, fraction
            )
        } else if minutes > 0 {
            format!("{}{}:{:02}.{:0width$}", sign, minutes, seconds, fraction)
        } else {
            format!("{}{}.{:0width$}", sign, seconds, fraction)
        }
    }

    /// Parse `[+|-][[h:]m:]s[.fraction]`, or `-` for unknown.
    ///
    /// Accepts every form `format` produces.
    pub fn parse(text: &str) -> Result<TimeValue> {
        let trimmed = text.trim();
        let invalid = || TimerError::InvalidTime(text.to_string());

        if trimmed == UNKNOWN_TEXT {
            return Ok(TimeValue::UNKNOWN);
        }

        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let fields: Vec<&str> = body.split(':').collect();
        if fields.len() > 3 {
            return Err(invalid());
        }

        let (whole, fraction) = match fields[fields.len() - 1].split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (fields[fields.len() - 1], None),
        };

        let mut nanos: i64 = 0;
        let multipliers = [NANOS_PER_HOUR, NANOS_PER_MINUTE, NANOS_PER_SECOND];
        let leading = &fields[..fields.len() - 1];
        let offset = 3 - fields.len();

        for (i, field) in leading.iter().chain(std::iter::once(&whole)).enumerate() {
            let value = parse_digits(field).ok_or_else(invalid)?;
            nanos = value
                .checked_mul(multipliers[offset + i])
                .and_then(|v| nanos.checked_add(v))
                .ok_or_else(invalid)?;
        }

        if let Some(fraction) = fraction {
            if fraction.is_empty() || fraction.len() > 9 {
                return Err(invalid());
            }
            let value = parse_digits(fraction).ok_or_else(invalid)?;
            let scale = 10_i64.pow(9 - fraction.len() as u32);
            nanos = nanos.checked_add(value * scale).ok_or_else(invalid)?;
        }

        Ok(TimeValue::from_nanos(if negative { -nanos } else { nanos }))
    }
}

fn parse_digits(field: &str) -> Option<i64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl Add for TimeValue {
    type Output = TimeValue;

    fn add(self, rhs: TimeValue) -> TimeValue {
        TimeValue::add(self, rhs)
    }
}

impl Sub for TimeValue {
    type Output = TimeValue;

    fn sub(self, rhs: TimeValue) -> TimeValue {
        self.subtract(rhs)
    }
}

impl Neg for TimeValue {
    type Output = TimeValue;

    fn neg(self) -> TimeValue {
        TimeValue {
            nanos: self.nanos.and_then(i64::checked_neg),
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false, &FormatConfig::default()))
    }
}

impl FromStr for TimeValue {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self> {
        TimeValue::parse(s)
    }
}

/// Source of timestamps for manually triggered input
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds elapsed since the clock was created
    pub fn now(&self) -> Timestamp {
        i64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
