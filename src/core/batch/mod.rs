//! Batched writes
//!
//! Pending operations are split by [`BatchChunker`] into groups no larger
//! than the store's batch ceiling and sent by [`BatchWriter`], which folds
//! every per-item and per-chunk result into one [`BatchOutcome`].

pub mod chunker;
pub mod outcome;
pub mod writer;

pub use chunker::{BatchChunker, Chunk};
pub use outcome::{BatchErrorKind, BatchItemError, BatchOutcome};
pub use writer::BatchWriter;
