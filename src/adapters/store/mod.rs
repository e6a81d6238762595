//! Record store adapter
//!
//! - [`traits`] - The [`RecordStore`] seam the engine talks to
//! - [`webapi`] - OData Web API implementation over reqwest
//! - [`multipart`] - `$batch` request/response bodies
//! - [`models`] - Response models and lookup-binding conventions

pub mod models;
pub mod multipart;
pub mod traits;
pub mod webapi;

pub use models::{bind_lookup, copyable_fields, lookup_value_key};
pub use traits::{ItemOutcome, RawPage, RecordStore};
pub use webapi::WebApiStore;
