//! Undo stack for a multi-step write

use crate::adapters::store::RecordStore;
use crate::domain::RecordRef;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// An action that reverses a completed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// Delete a record created earlier in the scope
    Delete(RecordRef),
}

impl fmt::Display for UndoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoAction::Delete(target) => write!(f, "delete {target}"),
        }
    }
}

/// What a rollback did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationReport {
    /// Undo actions executed
    pub attempted: usize,

    /// Undo actions that succeeded
    pub succeeded: usize,

    /// One message per failed undo action
    pub failures: Vec<String>,
}

impl CompensationReport {
    /// Whether every undo action succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Cloneable handle for registering undo actions
///
/// Handed to the body of a scope so later steps can add their own undo
/// actions while the body is running.
#[derive(Debug, Clone, Default)]
pub struct UndoRegistry {
    actions: Arc<Mutex<Vec<UndoAction>>>,
}

impl UndoRegistry {
    fn lock(&self) -> MutexGuard<'_, Vec<UndoAction>> {
        self.actions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Push an undo action; an identical action already on the stack is skipped
    pub fn register(&self, action: UndoAction) {
        let mut actions = self.lock();
        if actions.contains(&action) {
            tracing::debug!(action = %action, "Undo action already registered");
            return;
        }
        actions.push(action);
    }

    /// Number of registered actions
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn take(&self) -> Vec<UndoAction> {
        std::mem::take(&mut *self.lock())
    }
}

/// Undo stack for one multi-step write
///
/// Actions run in reverse registration order on rollback. A scope has to be
/// finished with [`commit`](Self::commit) or [`rollback`](Self::rollback);
/// dropping one with actions still registered logs a warning, since those
/// records are then orphaned.
pub struct CompensationScope<'a> {
    store: &'a dyn RecordStore,
    registry: UndoRegistry,
    finished: bool,
}

impl<'a> CompensationScope<'a> {
    /// Open an empty scope
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            registry: UndoRegistry::default(),
            finished: false,
        }
    }

    /// Register an undo action
    pub fn register(&self, action: UndoAction) {
        self.registry.register(action);
    }

    /// Handle for registering from inside the scope body
    pub fn registry(&self) -> UndoRegistry {
        self.registry.clone()
    }

    /// Keep everything; no undo action will run
    pub fn commit(mut self) {
        let discarded = self.registry.take();
        tracing::debug!(actions = discarded.len(), "Compensation scope committed");
        self.finished = true;
    }

    /// Run every undo action, newest first
    ///
    /// Undo failures are logged and reported, never returned as errors.
    pub async fn rollback(mut self) -> CompensationReport {
        let actions = self.registry.take();
        self.finished = true;

        let mut report = CompensationReport::default();
        for action in actions.into_iter().rev() {
            report.attempted += 1;
            match &action {
                UndoAction::Delete(target) => match self.store.delete(target).await {
                    Ok(()) => {
                        report.succeeded += 1;
                        tracing::info!(record = %target, "Compensating delete succeeded");
                    }
                    Err(e) => {
                        tracing::error!(
                            record = %target,
                            error = %e,
                            "Compensating delete failed; record left orphaned"
                        );
                        report
                            .failures
                            .push(format!("Failed to {action} during rollback: {e}"));
                    }
                },
            }
        }
        report
    }
}

impl Drop for CompensationScope<'_> {
    fn drop(&mut self) {
        if !self.finished && !self.registry.is_empty() {
            tracing::warn!(
                actions = self.registry.len(),
                "Compensation scope dropped without commit or rollback"
            );
        }
    }
}
