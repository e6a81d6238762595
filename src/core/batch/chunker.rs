//! Splitting pending operations into batch-sized chunks

use crate::config::MAX_CHUNK_SIZE;
use crate::domain::{EngineError, PendingOperation, Result};

/// One group of operations sent in a single batch call
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    /// 1-based chunk number
    pub number: usize,

    /// Index of the chunk's first operation in the full list
    pub offset: usize,

    /// Operations in the chunk, in source order
    pub operations: &'a [PendingOperation],
}

impl Chunk<'_> {
    /// Number of operations in the chunk
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the chunk is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Splits an ordered operation list into fixed-size chunks
#[derive(Debug, Clone, Copy)]
pub struct BatchChunker {
    size: usize,
}

impl BatchChunker {
    /// Creates a chunker with the given chunk size
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless `1 <= size <= 1000`.
    pub fn new(size: usize) -> Result<Self> {
        if !(1..=MAX_CHUNK_SIZE).contains(&size) {
            return Err(EngineError::Configuration(format!(
                "Chunk size must be between 1 and {MAX_CHUNK_SIZE}, got {size}"
            )));
        }
        Ok(Self { size })
    }

    /// Configured chunk size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of chunks `n` operations split into
    pub fn chunk_count(&self, n: usize) -> usize {
        n.div_ceil(self.size)
    }

    /// Chunks of `operations`, in source order
    pub fn chunk<'a>(
        &self,
        operations: &'a [PendingOperation],
    ) -> impl Iterator<Item = Chunk<'a>> + 'a {
        let size = self.size;
        operations
            .chunks(size)
            .enumerate()
            .map(move |(i, operations)| Chunk {
                number: i + 1,
                offset: i * size,
                operations,
            })
    }
}

impl Default for BatchChunker {
    fn default() -> Self {
        Self {
            size: MAX_CHUNK_SIZE,
        }
    }
}
