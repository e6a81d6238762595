//! Shared engine services handed to providers

use crate::adapters::store::RecordStore;
use crate::config::{BatchConfig, PagingConfig};
use crate::core::batch::{BatchChunker, BatchWriter};
use crate::core::compensation::CompensationCoordinator;
use crate::core::paging::{CursorReader, TokenDecoder};
use crate::domain::Result;
use std::sync::Arc;

use super::cancel::Cancellation;

/// Store plus read/write settings
///
/// Holds no per-run state, so one engine can serve any number of
/// sequential invocations.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn RecordStore>,
    decoder: Arc<dyn TokenDecoder>,
    page_size: usize,
    max_pages: usize,
    chunker: BatchChunker,
}

impl Engine {
    /// Creates a new engine
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the chunk size is out of range.
    pub fn new(
        store: Arc<dyn RecordStore>,
        decoder: Arc<dyn TokenDecoder>,
        paging: &PagingConfig,
        batch: &BatchConfig,
    ) -> Result<Self> {
        Ok(Self {
            store,
            decoder,
            page_size: paging.page_size,
            max_pages: paging.max_pages,
            chunker: BatchChunker::new(batch.chunk_size)?,
        })
    }

    /// The record store
    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Paged reader bound to `cancel`
    pub fn reader(&self, cancel: &Cancellation) -> CursorReader<'_> {
        CursorReader::new(
            self.store.as_ref(),
            self.decoder.as_ref(),
            self.page_size,
            self.max_pages,
        )
        .with_cancellation(cancel.clone())
    }

    /// Batch writer bound to `cancel`
    pub fn writer(&self, cancel: &Cancellation) -> BatchWriter<'_> {
        BatchWriter::new(self.store.as_ref(), self.chunker).with_cancellation(cancel.clone())
    }

    /// Compensation coordinator for the store
    pub fn coordinator(&self) -> CompensationCoordinator<'_> {
        CompensationCoordinator::new(self.store.as_ref())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store.describe())
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("chunk_size", &self.chunker.size())
            .finish()
    }
}
