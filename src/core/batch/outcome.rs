//! Aggregated result of a batched write

use crate::domain::{EngineError, ErrorContext, RecordRef, Result};
use std::collections::BTreeMap;
use std::fmt;

/// How an item came to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchErrorKind {
    /// The store rejected this one operation
    Item,
    /// The whole chunk carrying the operation failed to transport
    Transport,
    /// The run was cancelled before the operation was sent
    Cancelled,
}

/// A failed operation, addressed by its index in the original list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemError {
    /// Index in the full operation list
    pub index: usize,

    /// Record type the operation touched
    pub entity: String,

    /// Item or transport failure
    pub kind: BatchErrorKind,

    /// Message reported by the store or transport
    pub message: String,
}

impl BatchItemError {
    /// Operator-facing rendering
    pub fn context(&self) -> ErrorContext {
        let mut ctx = ErrorContext::new(self.message.clone())
            .with_phase("writing")
            .with_entity(self.entity.clone())
            .with_record(format!("index {}", self.index));
        if self.kind == BatchErrorKind::Transport {
            ctx = ctx.retryable();
        }
        ctx
    }
}

impl fmt::Display for BatchItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.context())
    }
}

/// Running totals of a batched write
///
/// `total_succeeded + errors.len() == total_requested` holds after every
/// merge; the writer turns any short or missing per-item result into an
/// error entry rather than letting the counts drift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Operations handed to the writer
    pub total_requested: usize,

    /// Operations the store committed
    pub total_succeeded: usize,

    /// One entry per failed operation
    pub errors: Vec<BatchItemError>,

    /// References of created records keyed by operation index
    pub created: BTreeMap<usize, RecordRef>,
}

impl BatchOutcome {
    /// Create a new empty outcome
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed operation
    pub fn add_success(&mut self, index: usize, created: Option<RecordRef>) {
        self.total_requested += 1;
        self.total_succeeded += 1;
        if let Some(reference) = created {
            self.created.insert(index, reference);
        }
    }

    /// Record a failed operation
    pub fn add_failure(
        &mut self,
        index: usize,
        entity: impl Into<String>,
        kind: BatchErrorKind,
        message: impl Into<String>,
    ) {
        self.total_requested += 1;
        self.errors.push(BatchItemError {
            index,
            entity: entity.into(),
            kind,
            message: message.into(),
        });
    }

    /// Merge another outcome into this one
    pub fn merge(&mut self, other: BatchOutcome) {
        self.total_requested += other.total_requested;
        self.total_succeeded += other.total_succeeded;
        self.errors.extend(other.errors);
        self.created.extend(other.created);
    }

    /// Whether every operation succeeded
    pub fn is_complete_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether the write stopped early on cancellation
    pub fn was_cancelled(&self) -> bool {
        self.errors
            .iter()
            .any(|error| error.kind == BatchErrorKind::Cancelled)
    }

    /// Whether the accounting identity holds
    pub fn accounting_holds(&self) -> bool {
        self.total_succeeded + self.errors.len() == self.total_requested
    }

    /// Fail unless every item of `step` was committed
    ///
    /// A cancelled write reports `Cancelled` so callers can tell a shutdown
    /// from store rejections.
    pub fn ensure_complete(&self, step: &str) -> Result<()> {
        if self.is_complete_success() {
            return Ok(());
        }
        let summary = format!(
            "{} of {} {step} failed: {}",
            self.errors.len(),
            self.total_requested,
            self.error_messages().join("; ")
        );
        if self.was_cancelled() {
            Err(EngineError::Cancelled(summary))
        } else {
            Err(EngineError::Batch(summary))
        }
    }

    /// Reference created by the operation at `index`
    pub fn created_ref(&self, index: usize) -> Option<&RecordRef> {
        self.created.get(&index)
    }

    /// Operator-facing error lines
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}
