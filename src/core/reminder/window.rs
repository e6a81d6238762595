//! Reminder due-date arithmetic
//!
//! A milestone offset is a day ordinal counted in calendar days from the
//! anchor date, with the anchor day as day 1. "Day 30" of a record anchored
//! on 2024-01-01 is 2024-01-30. The same mapping holds for every signed
//! offset, so day 0 is the day before the anchor and day -6 is one week
//! before it. Each offset lands on its own day.
//!
//! Arithmetic goes through `chrono`'s calendar-day helpers rather than
//! fixed 24-hour durations.

use crate::domain::{EngineError, Result};
use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open probe window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReminderWindow {
    /// Creates a window
    ///
    /// # Errors
    ///
    /// Returns `Validation` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(EngineError::Validation(format!(
                "Window start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Inclusive lower bound
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `ts` falls inside the window
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// The window of equal length starting where this one ends
    pub fn following(&self) -> Self {
        let length = self.end - self.start;
        Self {
            start: self.end,
            end: self.end + length,
        }
    }
}

impl fmt::Display for ReminderWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Timestamp a milestone lands on
///
/// `anchor + (offset_days - 1)` calendar days. Returns `None` if the date
/// falls outside the representable range.
pub fn milestone_target(anchor: DateTime<Utc>, offset_days: i64) -> Option<DateTime<Utc>> {
    let shift = offset_days.checked_sub(1)?;
    if shift >= 0 {
        anchor.checked_add_days(Days::new(shift.unsigned_abs()))
    } else {
        anchor.checked_sub_days(Days::new(shift.unsigned_abs()))
    }
}

/// Whether a single milestone falls inside the window
pub fn is_due(anchor: DateTime<Utc>, offset_days: i64, window: &ReminderWindow) -> bool {
    milestone_target(anchor, offset_days).is_some_and(|target| window.contains(target))
}

/// Offsets that fall inside the window, in the order given
pub fn due_offsets(anchor: DateTime<Utc>, offsets: &[i64], window: &ReminderWindow) -> Vec<i64> {
    offsets
        .iter()
        .copied()
        .filter(|offset| is_due(anchor, *offset, window))
        .collect()
}

/// Whether any milestone falls inside the window
pub fn is_due_any(anchor: DateTime<Utc>, offsets: &[i64], window: &ReminderWindow) -> bool {
    offsets.iter().any(|offset| is_due(anchor, *offset, window))
}
