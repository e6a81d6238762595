//! Provider run phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a single provider invocation
///
/// ```text
/// Idle -> Reading -> Transforming -> Writing -> (Compensating) -> Done
/// ```
///
/// Any phase except `Done` may also jump straight to `Done` when the run
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPhase {
    Idle,
    Reading,
    Transforming,
    Writing,
    Compensating,
    Done,
}

impl ProviderPhase {
    /// Whether moving from `self` to `next` is allowed
    pub fn can_transition_to(self, next: ProviderPhase) -> bool {
        use ProviderPhase::*;
        matches!(
            (self, next),
            (Idle, Reading)
                | (Reading, Transforming)
                | (Transforming, Writing)
                | (Writing, Compensating)
                | (Idle | Reading | Transforming | Writing | Compensating, Done)
        )
    }

    /// Lowercase name used in logs and error context
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderPhase::Idle => "idle",
            ProviderPhase::Reading => "reading",
            ProviderPhase::Transforming => "transforming",
            ProviderPhase::Writing => "writing",
            ProviderPhase::Compensating => "compensating",
            ProviderPhase::Done => "done",
        }
    }
}

impl fmt::Display for ProviderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
