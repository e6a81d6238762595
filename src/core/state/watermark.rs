//! Run watermark model
//!
//! A [`RunWatermark`] records how far a scheduled provider has got: the end
//! of the last window it processed and how its last run went. The next run
//! starts exactly where the recorded window ended.

use crate::core::reminder::ReminderWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the last run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No run has been recorded
    #[default]
    NotStarted,
    /// A run started and hasn't reported back (or the process died)
    InProgress,
    /// The last run finished and its window was consumed
    Completed,
    /// The last run failed; its window will be retried
    Failed,
    /// The last run was stopped by a shutdown signal
    Interrupted,
}

/// Progress marker for one scheduled provider
///
/// # Examples
///
/// ```
/// use grantflow::core::state::{RunStatus, RunWatermarkBuilder};
///
/// let watermark = RunWatermarkBuilder::new("reminders").runs_completed(3).build();
///
/// assert_eq!(watermark.runs_completed, 3);
/// assert_eq!(watermark.last_run_status, RunStatus::NotStarted);
/// assert!(watermark.last_window_end.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunWatermark {
    /// Provider name; also the storage key
    pub id: String,

    /// Start of the last consumed window
    pub last_window_start: Option<DateTime<Utc>>,

    /// End of the last consumed window; the next window starts here
    pub last_window_end: Option<DateTime<Utc>>,

    /// Runs whose window was consumed
    pub runs_completed: u64,

    /// When the last run started
    pub last_run_started_at: Option<DateTime<Utc>>,

    /// When the last run finished (None while in progress)
    pub last_run_completed_at: Option<DateTime<Utc>>,

    /// How the last run went
    pub last_run_status: RunStatus,
}

impl RunWatermark {
    /// Empty watermark for a provider
    pub fn new(provider: impl Into<String>) -> Self {
        RunWatermarkBuilder::new(provider).build()
    }

    pub fn is_in_progress(&self) -> bool {
        self.last_run_status == RunStatus::InProgress
    }

    pub fn is_completed(&self) -> bool {
        self.last_run_status == RunStatus::Completed
    }

    /// Duration of the last run if it finished
    pub fn last_run_duration(&self) -> Option<chrono::Duration> {
        match (self.last_run_started_at, self.last_run_completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }

    /// Mark a run as started
    pub fn mark_started(&mut self) {
        self.last_run_started_at = Some(Utc::now());
        self.last_run_completed_at = None;
        self.last_run_status = RunStatus::InProgress;
    }

    /// Consume `window`: the next run starts at its end
    pub fn mark_completed(&mut self, window: &ReminderWindow) {
        self.last_window_start = Some(window.start());
        self.last_window_end = Some(window.end());
        self.runs_completed += 1;
        self.last_run_completed_at = Some(Utc::now());
        self.last_run_status = RunStatus::Completed;
    }

    /// Record a failure; the window is not consumed
    pub fn mark_failed(&mut self) {
        self.last_run_completed_at = Some(Utc::now());
        self.last_run_status = RunStatus::Failed;
    }

    /// Record an interruption; the window is not consumed
    pub fn mark_interrupted(&mut self) {
        self.last_run_completed_at = Some(Utc::now());
        self.last_run_status = RunStatus::Interrupted;
    }
}

/// Builder for [`RunWatermark`]
pub struct RunWatermarkBuilder {
    id: String,
    last_window_start: Option<DateTime<Utc>>,
    last_window_end: Option<DateTime<Utc>>,
    runs_completed: u64,
    last_run_status: RunStatus,
}

impl RunWatermarkBuilder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            id: provider.into(),
            last_window_start: None,
            last_window_end: None,
            runs_completed: 0,
            last_run_status: RunStatus::NotStarted,
        }
    }

    /// Set the last consumed window
    pub fn last_window(mut self, window: &ReminderWindow) -> Self {
        self.last_window_start = Some(window.start());
        self.last_window_end = Some(window.end());
        self
    }

    pub fn runs_completed(mut self, count: u64) -> Self {
        self.runs_completed = count;
        self
    }

    pub fn last_run_status(mut self, status: RunStatus) -> Self {
        self.last_run_status = status;
        self
    }

    pub fn build(self) -> RunWatermark {
        RunWatermark {
            id: self.id,
            last_window_start: self.last_window_start,
            last_window_end: self.last_window_end,
            runs_completed: self.runs_completed,
            last_run_started_at: None,
            last_run_completed_at: None,
            last_run_status: self.last_run_status,
        }
    }
}
