//! Single-root saga around a multi-step write

use super::scope::{CompensationScope, UndoAction, UndoRegistry};
use crate::adapters::store::RecordStore;
use crate::core::provider::{ProviderPhase, RunContext};
use crate::domain::{RecordRef, Result};
use std::future::Future;

/// Runs a multi-step write so that a failure deletes what was created
///
/// The root record is created first. Its delete is the first undo action;
/// the body may register more through the [`UndoRegistry`] it receives. If
/// the body fails, for any reason including cancellation, the run moves to
/// the `Compensating` phase, every undo action runs newest first, and the
/// body's original error is returned. Undo failures are only logged.
pub struct CompensationCoordinator<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> CompensationCoordinator<'a> {
    /// Creates a coordinator for the store
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Create a root, run `body` against it, roll back on failure
    ///
    /// If `create_root` fails nothing was created, so its error is returned
    /// without any delete.
    ///
    /// # Errors
    ///
    /// Returns the error of `create_root` or of `body`.
    pub async fn with_scope<T, R, F, Fut>(
        &self,
        ctx: &mut RunContext,
        create_root: R,
        body: F,
    ) -> Result<T>
    where
        R: Future<Output = Result<RecordRef>>,
        F: FnOnce(RecordRef, UndoRegistry) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let root = create_root.await?;
        tracing::info!(record = %root, "Root record created; compensation scope open");

        let scope = CompensationScope::new(self.store);
        scope.register(UndoAction::Delete(root.clone()));

        match body(root.clone(), scope.registry()).await {
            Ok(value) => {
                scope.commit();
                tracing::info!(record = %root, "Compensation scope committed");
                Ok(value)
            }
            Err(original) => {
                tracing::warn!(
                    record = %root,
                    error = %original,
                    "Step failed inside compensation scope; rolling back"
                );

                if let Err(e) = ctx.enter(ProviderPhase::Compensating) {
                    tracing::warn!(error = %e, "Could not record compensating phase");
                }

                let report = scope.rollback().await;
                if report.is_clean() {
                    tracing::info!(undone = report.succeeded, "Rollback complete");
                } else {
                    tracing::error!(
                        undone = report.succeeded,
                        failed = report.failures.len(),
                        "Rollback incomplete; manual cleanup required"
                    );
                }

                Err(original)
            }
        }
    }
}
