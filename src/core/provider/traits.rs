//! The provider contract

use super::context::RunContext;
use super::engine::Engine;
use crate::domain::{ProcessResult, Result};
use async_trait::async_trait;

/// A scheduled or on-demand process built on the engine
///
/// The runner calls the three stages in order, moving the context through
/// `Reading`, `Transforming` and `Writing`:
///
/// - [`read`](Self::read) pulls everything the run needs through the paged
///   reader and returns it as one in-memory dataset.
/// - [`transform`](Self::transform) turns that dataset into a plan. It is
///   synchronous and gets no store access, so it can't make network calls,
///   and it must produce the same plan for the same dataset.
/// - [`write`](Self::write) carries the plan out through the batch writer,
///   optionally inside a compensation scope, and reports the outcome.
#[async_trait]
pub trait ProcessProvider: Send + Sync {
    /// Everything read in the `Reading` phase
    type Dataset: Send;

    /// Ordered writes decided in the `Transforming` phase
    type Plan: Send;

    /// Provider name, used in logs and state keys
    fn name(&self) -> &str;

    /// Read the full dataset
    ///
    /// # Errors
    ///
    /// Any error aborts the run before anything is written.
    async fn read(&self, ctx: &RunContext, engine: &Engine) -> Result<Self::Dataset>;

    /// Decide what to write
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the dataset can't be turned into a plan.
    fn transform(&self, ctx: &RunContext, dataset: Self::Dataset) -> Result<Self::Plan>;

    /// Number of write operations in a plan
    fn planned_operations(&self, plan: &Self::Plan) -> usize;

    /// Carry out the plan
    ///
    /// Item-level failures outside a compensation scope belong in the
    /// returned [`ProcessResult`]; an `Err` is a terminal failure of the run.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the write.
    async fn write(
        &self,
        ctx: &mut RunContext,
        engine: &Engine,
        plan: Self::Plan,
    ) -> Result<ProcessResult>;
}
