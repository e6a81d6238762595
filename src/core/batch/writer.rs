//! Sequential chunked batch writer

use super::chunker::{BatchChunker, Chunk};
use super::outcome::{BatchErrorKind, BatchOutcome};
use crate::adapters::store::{ItemOutcome, RecordStore};
use crate::core::provider::Cancellation;
use crate::domain::{PendingOperation, RecordRef, Result};
use crate::log_chunk_dispatch;

/// Writes operations through the store's batch endpoint
///
/// Chunks go out one at a time in source order. A chunk whose call fails
/// outright is recorded as one transport failure per item and the next chunk
/// is still sent. On cancellation the chunks already sent stay counted and
/// every unsent operation is recorded as a `Cancelled` failure. The writer
/// never rolls anything back; callers that need all-or-nothing wrap it in a
/// compensation scope.
pub struct BatchWriter<'a> {
    store: &'a dyn RecordStore,
    chunker: BatchChunker,
    cancel: Cancellation,
}

impl<'a> BatchWriter<'a> {
    /// Creates a new writer
    pub fn new(store: &'a dyn RecordStore, chunker: BatchChunker) -> Self {
        Self {
            store,
            chunker,
            cancel: Cancellation::none(),
        }
    }

    /// Honour a cancellation signal between chunks
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Write all operations and report per-item results
    ///
    /// Store failures and cancellation are both folded into the returned
    /// outcome, so the committed count survives an interrupted write.
    pub async fn write(&self, operations: &[PendingOperation]) -> Result<BatchOutcome> {
        let chunk_count = self.chunker.chunk_count(operations.len());
        let mut outcome = BatchOutcome::new();

        for chunk in self.chunker.chunk(operations) {
            if let Err(e) = self
                .cancel
                .check(&format!("writing chunk {}/{chunk_count}", chunk.number))
            {
                let unsent = Self::account_unsent(operations, chunk.offset, &e.to_string());
                tracing::warn!(
                    chunk = chunk.number,
                    committed = outcome.total_succeeded,
                    unsent = unsent.total_requested,
                    "Batch write cancelled; remaining operations not sent"
                );
                outcome.merge(unsent);
                break;
            }

            log_chunk_dispatch!(chunk.number, chunk_count, chunk.len());

            let chunk_outcome = match self.store.execute_batch(chunk.operations).await {
                Ok(results) => Self::account_items(&chunk, results),
                Err(e) => {
                    tracing::error!(
                        chunk = chunk.number,
                        items = chunk.len(),
                        error = %e,
                        "Batch call failed; recording every item in the chunk as failed"
                    );
                    Self::account_transport_failure(&chunk, &e.to_string())
                }
            };

            tracing::debug!(
                chunk = chunk.number,
                succeeded = chunk_outcome.total_succeeded,
                failed = chunk_outcome.errors.len(),
                "Chunk complete"
            );

            outcome.merge(chunk_outcome);
        }

        debug_assert!(outcome.accounting_holds());

        tracing::info!(
            requested = outcome.total_requested,
            succeeded = outcome.total_succeeded,
            failed = outcome.errors.len(),
            chunks = chunk_count,
            "Batch write complete"
        );

        Ok(outcome)
    }

    fn account_items(chunk: &Chunk<'_>, results: Vec<ItemOutcome>) -> BatchOutcome {
        let mut outcome = BatchOutcome::new();

        if results.len() > chunk.len() {
            tracing::warn!(
                chunk = chunk.number,
                expected = chunk.len(),
                received = results.len(),
                "Store returned more results than operations; extras ignored"
            );
        }

        let mut results = results.into_iter();
        for (i, operation) in chunk.operations.iter().enumerate() {
            let index = chunk.offset + i;
            match results.next() {
                Some(ItemOutcome::Succeeded { created }) => {
                    let reference = match (operation, created) {
                        (PendingOperation::Create { entity, .. }, Some(id)) => {
                            Some(RecordRef::new(entity.clone(), id))
                        }
                        _ => None,
                    };
                    outcome.add_success(index, reference);
                }
                Some(ItemOutcome::Failed { message }) => {
                    tracing::warn!(
                        index = index,
                        entity = %operation.entity(),
                        operation = operation.kind(),
                        error = %message,
                        "Batch item failed"
                    );
                    outcome.add_failure(
                        index,
                        operation.entity().as_str(),
                        BatchErrorKind::Item,
                        message,
                    );
                }
                None => {
                    outcome.add_failure(
                        index,
                        operation.entity().as_str(),
                        BatchErrorKind::Item,
                        "No result returned for operation",
                    );
                }
            }
        }

        outcome
    }

    fn account_unsent(operations: &[PendingOperation], from: usize, message: &str) -> BatchOutcome {
        let mut outcome = BatchOutcome::new();
        for (i, operation) in operations.iter().enumerate().skip(from) {
            outcome.add_failure(
                i,
                operation.entity().as_str(),
                BatchErrorKind::Cancelled,
                message,
            );
        }
        outcome
    }

    fn account_transport_failure(chunk: &Chunk<'_>, message: &str) -> BatchOutcome {
        let mut outcome = BatchOutcome::new();
        for (i, operation) in chunk.operations.iter().enumerate() {
            outcome.add_failure(
                chunk.offset + i,
                operation.entity().as_str(),
                BatchErrorKind::Transport,
                format!("Chunk {} failed to transport: {message}", chunk.number),
            );
        }
        outcome
    }
}
