//! Domain error types
//!
//! This module defines the error hierarchy for the engine. Errors are
//! domain-specific and don't expose third-party client types.

use thiserror::Error;

/// Main engine error type
///
/// Every fallible operation in the crate returns this type. The first four
/// variants mirror the failure taxonomy of a provider run: a failed read, a
/// failed batch, a failed rollback and an interrupted run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A page query failed; the whole read is aborted
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// One or more items of a batched write failed
    #[error("Batch error: {0}")]
    Batch(String),

    /// A compensating delete failed
    #[error("Compensation error: {0}")]
    Compensation(String),

    /// The run was cancelled by the host
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// Record store transport errors
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// State management errors
    #[error("State management error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl EngineError {
    /// Returns true if the error was raised by a cancellation signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled(_))
    }
}

/// Record store errors
///
/// Errors raised by the remote record store adapter. These don't expose
/// the HTTP client's own error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach the record store
    #[error("Failed to connect to record store: {0}")]
    ConnectionFailed(String),

    /// The store rejected the bearer token
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Response body could not be understood
    #[error("Invalid response from record store: {0}")]
    InvalidResponse(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Throttled by the store (429)
    #[error("Request throttled, retry after: {0}")]
    Throttled(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl StoreError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionFailed(_)
                | StoreError::Throttled(_)
                | StoreError::ServerError { .. }
                | StoreError::Timeout(_)
        )
    }

    /// Build an error from an HTTP status code and response body
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => StoreError::AuthenticationFailed(message),
            404 => StoreError::NotFound(message),
            429 => StoreError::Throttled(message),
            500..=599 => StoreError::ServerError { status, message },
            _ => StoreError::ClientError { status, message },
        }
    }
}

/// Operator-facing error context
///
/// Carries the phase, record type and record id alongside the underlying
/// message so that a failure can be re-run or repaired by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Provider phase the failure occurred in
    pub phase: Option<String>,

    /// Record type involved
    pub entity: Option<String>,

    /// Record identifier or operation index involved
    pub record: Option<String>,

    /// Error message
    pub message: String,

    /// Whether the error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    /// Creates a new error context
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            phase: None,
            entity: None,
            record: None,
            message: message.into(),
            retryable: false,
        }
    }

    /// Sets the phase
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Sets the record type
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Sets the record identifier
    pub fn with_record(mut self, record: impl Into<String>) -> Self {
        self.record = Some(record.into());
        self
    }

    /// Marks the error as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags = Vec::new();
        if let Some(phase) = &self.phase {
            tags.push(format!("phase={phase}"));
        }
        if let Some(entity) = &self.entity {
            tags.push(format!("entity={entity}"));
        }
        if let Some(record) = &self.record {
            tags.push(format!("record={record}"));
        }

        if tags.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", tags.join(", "), self.message)
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Configuration(format!("TOML parse error: {err}"))
    }
}
