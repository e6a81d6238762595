//! Compensating rollback for multi-record writes
//!
//! The record store has no transactions spanning several records. A write
//! that creates a root record and then a tree of dependents runs inside a
//! [`CompensationCoordinator`] scope: if any later step fails, the undo stack
//! is replayed in reverse so the aggregate disappears instead of being left
//! half-built.

pub mod coordinator;
pub mod scope;

pub use coordinator::CompensationCoordinator;
pub use scope::{CompensationReport, CompensationScope, UndoAction, UndoRegistry};
