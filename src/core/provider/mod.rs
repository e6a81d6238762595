//! Provider execution
//!
//! - [`phase`] - The per-run phase machine
//! - [`context`] - Per-invocation state
//! - [`cancel`] - Cooperative cancellation
//! - [`engine`] - Store, reader and writer shared by providers
//! - [`traits`] - The [`ProcessProvider`] contract
//! - [`runner`] - Drives a provider and produces its `ProcessResult`

pub mod cancel;
pub mod context;
pub mod engine;
pub mod phase;
pub mod runner;
pub mod traits;

pub use cancel::Cancellation;
pub use context::RunContext;
pub use engine::Engine;
pub use phase::ProviderPhase;
pub use runner::ProviderRunner;
pub use traits::ProcessProvider;
