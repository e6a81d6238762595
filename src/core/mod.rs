//! Core engine for grantflow.
//!
//! # Modules
//!
//! - [`paging`] - Continuation-token reads that run to exhaustion
//! - [`batch`] - Chunked batch writes with strict per-item accounting
//! - [`compensation`] - Undo stack emulating a transaction over one aggregate
//! - [`reminder`] - Due-date windows and run-window scheduling
//! - [`state`] - Run watermarks so scheduled windows never gap or overlap
//! - [`provider`] - The provider contract, run context and runner
//!
//! # Run Workflow
//!
//! 1. **Read**: page through the store until no continuation token is left
//! 2. **Transform**: turn the in-memory dataset into ordered pending writes
//! 3. **Write**: send them in chunks of at most 1000
//! 4. **Compensate** (scoped writes only): delete the root if anything failed
//! 5. **Report**: hand a `ProcessResult` back to the caller
//!
//! # Example
//!
//! ```rust,no_run
//! use grantflow::config::load_config;
//! use grantflow::core::provider::{Engine, ProviderRunner, RunContext};
//! use grantflow::providers::QuestionnaireProvider;
//!
//! # async fn example(engine: Engine) -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("grantflow.toml")?;
//! let provider = QuestionnaireProvider::new(config.questionnaire.clone().unwrap())?;
//!
//! let ctx = RunContext::new("questionnaire").with_source("6f1c1d5e-3f3e-4d0a-9a53-0c3c1f3c9a10".parse()?);
//! let result = ProviderRunner::new(&engine).run(&provider, ctx).await;
//!
//! println!("{:?}: {}/{}", result.status, result.processed_count, result.total_count);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod compensation;
pub mod paging;
pub mod provider;
pub mod reminder;
pub mod state;
