//! Per-invocation run context
//!
//! Everything a run needs that isn't configuration lives here: its id, the
//! current phase, the probe window or source record it was started for and
//! the cancellation signal. A context is built fresh for every invocation and
//! passed down explicitly; providers never keep run state on themselves.

use super::cancel::Cancellation;
use super::phase::ProviderPhase;
use crate::core::reminder::ReminderWindow;
use crate::domain::{EngineError, ErrorContext, RecordId, Result};
use crate::log_phase_transition;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// State of one provider invocation
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    provider: String,
    phase: ProviderPhase,
    started_at: DateTime<Utc>,
    window: Option<ReminderWindow>,
    source: Option<RecordId>,
    cancel: Cancellation,
}

impl RunContext {
    /// Fresh context in the `Idle` phase
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            provider: provider.into(),
            phase: ProviderPhase::Idle,
            started_at: Utc::now(),
            window: None,
            source: None,
            cancel: Cancellation::none(),
        }
    }

    /// Sets the probe window
    pub fn with_window(mut self, window: ReminderWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Sets the source record
    pub fn with_source(mut self, source: RecordId) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the cancellation signal
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Identifier shared by every log line of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Name of the provider being run
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Current phase of the run
    pub fn phase(&self) -> ProviderPhase {
        self.phase
    }

    /// When the context was created
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Probe window for scheduled providers, `None` for triggered ones
    pub fn window(&self) -> Option<&ReminderWindow> {
        self.window.as_ref()
    }

    /// Record that triggered the run, if any
    pub fn source(&self) -> Option<RecordId> {
        self.source
    }

    /// Cancellation handle checked between pages and chunks
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// The probe window, or a `Validation` error naming the provider
    pub fn require_window(&self) -> Result<ReminderWindow> {
        self.window.ok_or_else(|| {
            EngineError::Validation(format!("Provider {} requires a run window", self.provider))
        })
    }

    /// The source record, or a `Validation` error naming the provider
    pub fn require_source(&self) -> Result<RecordId> {
        self.source.ok_or_else(|| {
            EngineError::Validation(format!(
                "Provider {} requires a source record id",
                self.provider
            ))
        })
    }

    /// Move to the next phase
    ///
    /// # Errors
    ///
    /// Returns `State` for a transition the phase machine doesn't allow.
    pub fn enter(&mut self, next: ProviderPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(EngineError::State(format!(
                "Invalid phase transition {} -> {next} for provider {}",
                self.phase, self.provider
            )));
        }
        log_phase_transition!(self.provider, self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Error context tagged with the current phase
    pub fn error_context(&self, message: impl Into<String>) -> ErrorContext {
        ErrorContext::new(message).with_phase(self.phase.as_str())
    }
}
