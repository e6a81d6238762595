//! Record store abstraction
//!
//! This module defines the trait the engine talks to. The production
//! implementation is [`WebApiStore`](super::webapi::WebApiStore); tests plug
//! in scripted in-memory stores.

use crate::core::paging::PageRequest;
use crate::domain::{EntityName, Payload, PendingOperation, Record, RecordId, RecordRef, Result};
use async_trait::async_trait;

/// One page exactly as the store returned it
///
/// `raw_token` is the still-encoded cursor annotation; decoding it is the
/// reader's job, not the store's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    /// Records on the page
    pub items: Vec<Record>,

    /// Whether the store reports more records after this page
    pub more_records: bool,

    /// Encoded cursor for the next page, when present
    pub raw_token: Option<String>,
}

impl RawPage {
    /// A final page
    pub fn last(items: Vec<Record>) -> Self {
        Self {
            items,
            more_records: false,
            raw_token: None,
        }
    }

    /// A page with a cursor for the next one
    pub fn with_more(items: Vec<Record>, raw_token: impl Into<String>) -> Self {
        Self {
            items,
            more_records: true,
            raw_token: Some(raw_token.into()),
        }
    }
}

/// Per-item result of a batch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The operation was committed; creates report the new identifier
    Succeeded { created: Option<RecordId> },

    /// The operation was rejected
    Failed { message: String },
}

impl ItemOutcome {
    /// A committed update or delete
    pub fn ok() -> Self {
        ItemOutcome::Succeeded { created: None }
    }

    /// A committed create
    pub fn created(id: RecordId) -> Self {
        ItemOutcome::Succeeded { created: Some(id) }
    }

    /// A rejected operation
    pub fn failed(message: impl Into<String>) -> Self {
        ItemOutcome::Failed {
            message: message.into(),
        }
    }

    /// Returns true for committed operations
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }
}

/// Remote record store
///
/// All calls are independent request/response exchanges. Implementations
/// retry transient transport failures themselves; an `Err` returned from
/// here is final for that call.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Execute one page of a paged query
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response can't be read.
    async fn query_page(&self, request: &PageRequest) -> Result<RawPage>;

    /// Submit up to 1000 operations as one batch call
    ///
    /// The store processes every item even when some fail and reports one
    /// [`ItemOutcome`] per operation, in submission order.
    ///
    /// # Errors
    ///
    /// Returns an error only when the call as a whole fails (transport,
    /// authentication, unreadable response).
    async fn execute_batch(&self, operations: &[PendingOperation]) -> Result<Vec<ItemOutcome>>;

    /// Create a single record and return its reference
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the record.
    async fn create(&self, entity: &EntityName, payload: &Payload) -> Result<RecordRef>;

    /// Delete a single record
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete.
    async fn delete(&self, target: &RecordRef) -> Result<()>;

    /// Short human-readable description used in logs and `status`
    fn describe(&self) -> String;
}
