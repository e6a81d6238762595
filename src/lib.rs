// Grantflow - Process-Provider Execution Engine
// Copyright (c) 2025 Grantflow Contributors
// Licensed under the MIT License

//! # grantflow - process providers over a remote record store
//!
//! grantflow runs scheduled and on-demand business processes ("providers")
//! against a remote, API-only record store that offers paged queries and
//! batched writes but no multi-record transactions.
//!
//! ## Overview
//!
//! This library provides:
//! - **Reading** full datasets through continuation-token paging
//! - **Writing** pending operations in batches of at most 1000 with strict
//!   per-item accounting
//! - **Compensating** multi-record writes by deleting the root on failure
//! - **Scheduling** reminder windows that never gap or overlap
//! - **Reporting** every run as one uniform `ProcessResult`
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Engine (paging, batching, compensation, reminders, state, runner)
//! - [`providers`] - Concrete providers built on the engine
//! - [`adapters`] - The record store client
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grantflow::adapters::store::WebApiStore;
//! use grantflow::config::load_config;
//! use grantflow::core::paging::PagingCookieDecoder;
//! use grantflow::core::provider::{Engine, ProviderRunner, RunContext};
//! use grantflow::core::reminder::{RunSchedule, ScheduledWindow};
//! use grantflow::providers::{ReminderProvider, REMINDER_PROVIDER};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("grantflow.toml")?;
//!
//!     let store = WebApiStore::new(&config.store, config.application.dry_run)?;
//!     let engine = Engine::new(
//!         Arc::new(store),
//!         Arc::new(PagingCookieDecoder),
//!         &config.paging,
//!         &config.batch,
//!     )?;
//!
//!     let provider = ReminderProvider::new(config.reminders.clone().unwrap())?;
//!     if let ScheduledWindow::Due(window) = RunSchedule::daily().next_window(None, chrono::Utc::now())? {
//!         let ctx = RunContext::new(REMINDER_PROVIDER).with_window(window);
//!         let result = ProviderRunner::new(&engine).run(&provider, ctx).await;
//!         println!("{}/{} notifications created", result.processed_count, result.total_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`], whose error is
//! [`domain::EngineError`]. Failures inside a run never escape the runner:
//! they are folded into the returned `ProcessResult`.
//!
//! ## Logging
//!
//! grantflow uses structured logging with the `tracing` crate. Every run is
//! wrapped in a `provider_run` span carrying the provider name and run id.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod providers;
