//! Configuration management for grantflow.
//!
//! TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! grantflow uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `GRANTFLOW_*` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`StoreConfig`] - Record store connection, bearer token and retries
//! - [`PagingConfig`] - Page size and the runaway-read page bound
//! - [`BatchConfig`] - Operations per batch call (at most 1000)
//! - [`StateConfig`] - Where run-window watermarks are kept
//! - [`ReminderConfig`] - Reminder provider settings
//! - [`QuestionnaireConfig`] - Questionnaire copy provider settings
//! - [`LoggingConfig`] - File logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [store]
//! base_url = "https://funding.example.com"
//! access_token = "${GRANTFLOW_TOKEN}"
//!
//! [paging]
//! page_size = 5000
//! max_pages = 10000
//!
//! [batch]
//! chunk_size = 1000
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, BatchConfig, Environment, GrantflowConfig, LoggingConfig, PagingConfig,
    QuestionnaireConfig, ReminderConfig, RetryConfig, StateConfig, StoreConfig, MAX_CHUNK_SIZE,
    MAX_PAGE_SIZE,
};
pub use secret::{secret_string, SecretString, SecretValue};
