//! Domain models and types for grantflow.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`EntityName`], [`RecordId`], [`RecordRef`])
//! - **Record models** ([`Record`], [`PendingOperation`])
//! - **Run outcome** ([`ProcessResult`], [`ProcessStatus`])
//! - **Error types** ([`EngineError`], [`StoreError`], [`ErrorContext`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, EngineError>`]:
//!
//! ```rust
//! use grantflow::domain::{EngineError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = grantflow::config::load_config("grantflow.toml")?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod process_result;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{EngineError, ErrorContext, StoreError};
pub use ids::{EntityName, RecordId, RecordRef};
pub use process_result::{ProcessResult, ProcessStatus};
pub use record::{Payload, PendingOperation, Record};
pub use result::Result;
