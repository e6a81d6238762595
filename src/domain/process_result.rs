//! Uniform outcome of a provider run
//!
//! [`ProcessResult`] is the only thing a run hands back to its caller
//! (scheduler or HTTP layer). It is built once and never persisted here.

use serde::{Deserialize, Serialize};

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Every requested operation succeeded
    Success,
    /// Some operations succeeded and some failed
    PartialFailure,
    /// Nothing useful was committed
    Failure,
}

/// Outcome of a single provider invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Terminal status
    pub status: ProcessStatus,

    /// Number of operations that were committed
    pub processed_count: usize,

    /// Number of operations that were attempted or planned
    pub total_count: usize,

    /// Operator-facing error messages
    pub errors: Vec<String>,
}

impl ProcessResult {
    /// A run where every operation succeeded
    pub fn success(processed_count: usize) -> Self {
        Self {
            status: ProcessStatus::Success,
            processed_count,
            total_count: processed_count,
            errors: Vec::new(),
        }
    }

    /// A run that failed outright
    pub fn failure(total_count: usize, errors: Vec<String>) -> Self {
        Self {
            status: ProcessStatus::Failure,
            processed_count: 0,
            total_count,
            errors,
        }
    }

    /// Derive a result from counts and errors
    ///
    /// No errors means success; errors with at least one committed operation
    /// is a partial failure; errors with nothing committed is a failure.
    pub fn from_counts(processed_count: usize, total_count: usize, errors: Vec<String>) -> Self {
        let status = if errors.is_empty() {
            ProcessStatus::Success
        } else if processed_count > 0 {
            ProcessStatus::PartialFailure
        } else {
            ProcessStatus::Failure
        };

        Self {
            status,
            processed_count,
            total_count,
            errors,
        }
    }

    /// Whether the run is a full success
    pub fn is_success(&self) -> bool {
        self.status == ProcessStatus::Success
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ProcessStatus::Success => 0,
            ProcessStatus::PartialFailure => 1,
            ProcessStatus::Failure => 3,
        }
    }
}
