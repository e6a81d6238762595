//! State manager for run watermarks

use super::storage::StateStorage;
use super::watermark::RunWatermark;
use crate::core::reminder::{ReminderWindow, RunSchedule, ScheduledWindow};
use crate::domain::{ProcessResult, ProcessStatus, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Loads watermarks, picks the next window, records run outcomes
///
/// In dry-run mode nothing is saved, so a rehearsal never consumes a window.
pub struct StateManager {
    storage: Arc<dyn StateStorage>,
    dry_run: bool,
}

impl StateManager {
    pub fn new(storage: Arc<dyn StateStorage>, dry_run: bool) -> Self {
        Self { storage, dry_run }
    }

    /// Load a provider's watermark
    ///
    /// # Errors
    ///
    /// Returns an error if storage can't be read.
    pub async fn load_watermark(&self, provider: &str) -> Result<Option<RunWatermark>> {
        self.storage.load_watermark(provider).await
    }

    /// Save a watermark (skipped in dry-run mode)
    ///
    /// # Errors
    ///
    /// Returns an error if storage can't be written.
    pub async fn save_watermark(&self, watermark: &RunWatermark) -> Result<()> {
        if self.dry_run {
            tracing::info!(provider = %watermark.id, "Dry run: watermark not saved");
            return Ok(());
        }
        self.storage.save_watermark(watermark).await
    }

    /// All saved watermarks
    ///
    /// # Errors
    ///
    /// Returns an error if storage can't be listed.
    pub async fn get_all_watermarks(&self) -> Result<Vec<RunWatermark>> {
        self.storage.get_all_watermarks().await
    }

    /// The window a run started at `now` should process
    ///
    /// # Errors
    ///
    /// Returns an error if the watermark can't be loaded.
    pub async fn next_window(
        &self,
        provider: &str,
        schedule: &RunSchedule,
        now: DateTime<Utc>,
    ) -> Result<ScheduledWindow> {
        let previous_end = self
            .load_watermark(provider)
            .await?
            .and_then(|w| w.last_window_end);
        schedule.next_window(previous_end, now)
    }

    /// Mark a run as started and return the watermark to finish later
    ///
    /// # Errors
    ///
    /// Returns an error if the watermark can't be loaded or saved.
    pub async fn begin_run(&self, provider: &str) -> Result<RunWatermark> {
        let mut watermark = self
            .load_watermark(provider)
            .await?
            .unwrap_or_else(|| RunWatermark::new(provider));

        if watermark.is_in_progress() {
            tracing::warn!(
                provider = provider,
                "Previous run never reported back; starting again from its window"
            );
        }

        watermark.mark_started();
        self.save_watermark(&watermark).await?;
        Ok(watermark)
    }

    /// Record how a run over `window` ended
    ///
    /// Success and partial failure consume the window; item failures in a
    /// reminder run are reported, not retried, so re-running the window
    /// would duplicate every reminder that did go out. A failed or
    /// interrupted run leaves the window to be processed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the watermark can't be saved.
    pub async fn finish_run(
        &self,
        mut watermark: RunWatermark,
        window: &ReminderWindow,
        result: &ProcessResult,
        interrupted: bool,
    ) -> Result<RunWatermark> {
        match (result.status, interrupted) {
            (ProcessStatus::Success | ProcessStatus::PartialFailure, _) => {
                watermark.mark_completed(window)
            }
            (ProcessStatus::Failure, true) => watermark.mark_interrupted(),
            (ProcessStatus::Failure, false) => watermark.mark_failed(),
        }

        tracing::info!(
            provider = %watermark.id,
            status = ?watermark.last_run_status,
            window = %window,
            runs_completed = watermark.runs_completed,
            "Recording run outcome"
        );

        self.save_watermark(&watermark).await?;
        Ok(watermark)
    }
}
