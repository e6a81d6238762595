//! External system integrations for grantflow.
//!
//! - [`store`] - The remote record store: paged queries, `$batch` writes,
//!   single creates and deletes
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the engine can be
//! tested against in-memory implementations. Nothing outside this module
//! sees an HTTP type.
//!
//! ```rust,no_run
//! use grantflow::adapters::store::{RecordStore, WebApiStore};
//! use grantflow::config::{secret_string, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig {
//!     base_url: "https://funding.example.com".to_string(),
//!     access_token: Some(secret_string("token".to_string())),
//!     ..Default::default()
//! };
//!
//! let store = WebApiStore::new(&config, false)?;
//! println!("Connected to {}", store.describe());
//! # Ok(())
//! # }
//! ```

pub mod store;
