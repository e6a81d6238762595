//! Cooperative cancellation

use crate::domain::{EngineError, Result};
use tokio::sync::watch;

/// Read side of a shutdown signal
///
/// Checked between pages and between chunks; an in-flight request is never
/// interrupted. A `Cancellation` without a receiver never fires.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    signal: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// A cancellation that never fires
    pub fn none() -> Self {
        Self { signal: None }
    }

    /// Follow a shutdown channel; `true` means stop
    pub fn from_receiver(receiver: watch::Receiver<bool>) -> Self {
        Self {
            signal: Some(receiver),
        }
    }

    /// Whether the signal has fired
    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fail with `Cancelled` if the signal has fired
    ///
    /// `activity` names what was about to happen, for the error message.
    pub fn check(&self, activity: &str) -> Result<()> {
        if self.is_cancelled() {
            tracing::warn!(activity = activity, "Cancellation requested");
            return Err(EngineError::Cancelled(format!(
                "Shutdown requested before {activity}"
            )));
        }
        Ok(())
    }
}
