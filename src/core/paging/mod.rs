//! Paged reads with continuation tokens
//!
//! - [`query`] - Query templates and page requests
//! - [`token`] - Continuation token decoding
//! - [`page`] - Result pages
//! - [`cursor`] - The read-to-exhaustion loop

pub mod cursor;
pub mod page;
pub mod query;
pub mod token;

pub use cursor::CursorReader;
pub use page::{ContinuationToken, ResultPage};
pub use query::{xml_escape, PageRequest, QueryTemplate, RecordQuery};
pub use token::{PagingCookieDecoder, PassthroughDecoder, TokenDecoder};
