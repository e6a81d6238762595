//! Run-window scheduling
//!
//! Each scheduled reminder run covers the window between the previous run's
//! end and "now" truncated down to the run interval. Windows therefore abut
//! exactly: a late or skipped run widens the next window instead of leaving
//! a gap, and a run fired twice inside one interval gets nothing to do.

use super::window::ReminderWindow;
use crate::domain::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};

/// What the scheduler should do on this invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledWindow {
    /// Process this window
    Due(ReminderWindow),
    /// The previous run already covered everything up to now
    UpToDate,
}

/// Fixed-interval run schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSchedule {
    interval: Duration,
}

impl RunSchedule {
    /// Schedule with an interval given in hours
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless the interval evenly divides a day.
    pub fn from_hours(hours: u32) -> Result<Self> {
        if hours == 0 || 24 % hours != 0 {
            return Err(EngineError::Configuration(format!(
                "Run interval must divide 24 hours, got {hours}"
            )));
        }
        Ok(Self {
            interval: Duration::hours(i64::from(hours)),
        })
    }

    /// Daily schedule
    pub fn daily() -> Self {
        Self {
            interval: Duration::days(1),
        }
    }

    /// Run interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `now` rounded down to an interval boundary (UTC, aligned to midnight)
    pub fn truncate(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let interval = self.interval.num_seconds();
        let secs = now.timestamp();
        let aligned = secs - secs.rem_euclid(interval);
        DateTime::from_timestamp(aligned, 0).unwrap_or(now)
    }

    /// Window for a first run: the last full interval before `now`
    pub fn current_window(&self, now: DateTime<Utc>) -> Result<ReminderWindow> {
        let end = self.truncate(now);
        ReminderWindow::new(end - self.interval, end)
    }

    /// Window following a previous run that ended at `previous_end`
    pub fn next_window(
        &self,
        previous_end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<ScheduledWindow> {
        let Some(start) = previous_end else {
            return self.current_window(now).map(ScheduledWindow::Due);
        };

        let end = self.truncate(now);
        if end <= start {
            return Ok(ScheduledWindow::UpToDate);
        }
        ReminderWindow::new(start, end).map(ScheduledWindow::Due)
    }
}

impl Default for RunSchedule {
    fn default() -> Self {
        Self::daily()
    }
}
