//! Logging and observability
//!
//! Structured logging with:
//! - JSON-formatted file logs with daily or hourly rotation
//! - Human-readable console output
//! - Log level from configuration, overridable through `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use grantflow::logging::init_logging;
//! use grantflow::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(provider = "reminders", "Run started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a provider phase change
///
/// # Example
///
/// ```no_run
/// use grantflow::log_phase_transition;
///
/// log_phase_transition!("reminders", "reading", "transforming");
/// ```
#[macro_export]
macro_rules! log_phase_transition {
    ($provider:expr, $from:expr, $to:expr) => {
        tracing::info!(
            provider = %$provider,
            from = %$from,
            to = %$to,
            "Phase transition"
        );
    };
}

/// Log the dispatch of one batch chunk
///
/// # Example
///
/// ```no_run
/// use grantflow::log_chunk_dispatch;
///
/// log_chunk_dispatch!(2, 3, 1000);
/// ```
#[macro_export]
macro_rules! log_chunk_dispatch {
    ($chunk:expr, $chunks:expr, $items:expr) => {
        tracing::debug!(
            chunk = $chunk,
            chunks = $chunks,
            items = $items,
            progress_pct = ($chunk as f64 / $chunks as f64 * 100.0),
            "Dispatching batch chunk"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use grantflow::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying request"
        );
    };
}
