//! Driving a provider through its phases

use super::context::RunContext;
use super::engine::Engine;
use super::phase::ProviderPhase;
use super::traits::ProcessProvider;
use crate::domain::{EngineError, ProcessResult};
use std::time::Instant;
use tracing::Instrument;

/// Runs providers against an engine
///
/// The runner owns the phase machine. Whatever happens inside the provider,
/// the caller gets a [`ProcessResult`] back and the context ends in `Done`.
pub struct ProviderRunner<'a> {
    engine: &'a Engine,
}

impl<'a> ProviderRunner<'a> {
    /// Creates a runner
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Execute one invocation of `provider`
    pub async fn run<P: ProcessProvider>(&self, provider: &P, ctx: RunContext) -> ProcessResult {
        let span = tracing::info_span!(
            "provider_run",
            provider = provider.name(),
            run_id = %ctx.run_id()
        );
        self.run_phases(provider, ctx).instrument(span).await
    }

    async fn run_phases<P: ProcessProvider>(&self, provider: &P, mut ctx: RunContext) -> ProcessResult {
        let started = Instant::now();
        tracing::info!(
            window = ?ctx.window().map(ToString::to_string),
            source = ?ctx.source().map(|s| s.to_string()),
            "Provider run started"
        );

        if let Err(e) = ctx.enter(ProviderPhase::Reading) {
            return Self::fail(&mut ctx, e, 0);
        }
        let dataset = match provider.read(&ctx, self.engine).await {
            Ok(dataset) => dataset,
            Err(e) => return Self::fail(&mut ctx, e, 0),
        };

        if let Err(e) = ctx.enter(ProviderPhase::Transforming) {
            return Self::fail(&mut ctx, e, 0);
        }
        let plan = match provider.transform(&ctx, dataset) {
            Ok(plan) => plan,
            Err(e) => return Self::fail(&mut ctx, e, 0),
        };
        let planned = provider.planned_operations(&plan);
        tracing::info!(planned = planned, "Plan ready");

        if let Err(e) = ctx.enter(ProviderPhase::Writing) {
            return Self::fail(&mut ctx, e, planned);
        }
        let result = match provider.write(&mut ctx, self.engine, plan).await {
            Ok(result) => result,
            Err(e) => return Self::fail(&mut ctx, e, planned),
        };

        Self::finish(&mut ctx);
        tracing::info!(
            status = ?result.status,
            processed = result.processed_count,
            total = result.total_count,
            errors = result.errors.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Provider run finished"
        );
        result
    }

    fn fail(ctx: &mut RunContext, error: EngineError, total: usize) -> ProcessResult {
        let message = ctx.error_context(error.to_string()).to_string();
        if error.is_cancelled() {
            tracing::warn!(error = %message, "Provider run interrupted");
        } else {
            tracing::error!(error = %message, "Provider run failed");
        }
        Self::finish(ctx);
        ProcessResult::failure(total, vec![message])
    }

    fn finish(ctx: &mut RunContext) {
        if let Err(e) = ctx.enter(ProviderPhase::Done) {
            tracing::warn!(error = %e, "Run already finished");
        }
    }
}
