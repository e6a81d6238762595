//! Result pages and continuation tokens

use crate::domain::Record;
use std::fmt;

/// Opaque cursor for the next page of a read session
///
/// The engine never looks inside a token: it is produced by a
/// [`TokenDecoder`](super::token::TokenDecoder) and handed back to the store
/// unchanged on the next request.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wraps a decoded token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens can be long; keep them out of log lines.
impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken({} bytes)", self.0.len())
    }
}

/// One page of records returned by a single query invocation
///
/// A page either carries a token for the next page or is the last page;
/// `has_more()` is derived from the token so the two can't disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    items: Vec<Record>,
    continuation: Option<ContinuationToken>,
}

impl ResultPage {
    /// The final page of a read
    pub fn last(items: Vec<Record>) -> Self {
        Self {
            items,
            continuation: None,
        }
    }

    /// A page followed by at least one more
    pub fn with_more(items: Vec<Record>, token: ContinuationToken) -> Self {
        Self {
            items,
            continuation: Some(token),
        }
    }

    /// Whether the store has more records after this page
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    /// Records on this page
    pub fn items(&self) -> &[Record] {
        &self.items
    }

    /// Token for the next page, if any
    pub fn continuation_token(&self) -> Option<&ContinuationToken> {
        self.continuation.as_ref()
    }

    /// Split into items and next-page token
    pub fn into_parts(self) -> (Vec<Record>, Option<ContinuationToken>) {
        (self.items, self.continuation)
    }
}
