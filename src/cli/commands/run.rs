//! Run command implementation
//!
//! This module implements the `run` command, which executes one invocation
//! of a provider against the configured record store.

use crate::adapters::store::WebApiStore;
use crate::cli::{EXIT_CONFIG, EXIT_INTERRUPTED, EXIT_SUCCESS};
use crate::config::{load_config, GrantflowConfig};
use crate::core::paging::PagingCookieDecoder;
use crate::core::provider::{Cancellation, Engine, ProviderRunner, RunContext};
use crate::core::reminder::{ReminderWindow, RunSchedule, ScheduledWindow};
use crate::core::state::{FileStateStorage, StateManager};
use crate::domain::{ProcessResult, RecordId};
use crate::providers::{
    QuestionnaireProvider, ReminderProvider, QUESTIONNAIRE_PROVIDER, REMINDER_PROVIDER,
};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use std::sync::Arc;
use tokio::sync::watch;

/// Providers the CLI can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Milestone reminders for the next run window
    Reminders,
    /// Copy a template questionnaire
    Questionnaire,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Provider to run
    #[arg(value_enum)]
    pub provider: ProviderKind,

    /// Dry run mode - read and plan, but don't write to the store
    #[arg(long)]
    pub dry_run: bool,

    /// Template questionnaire to copy (questionnaire provider)
    #[arg(long, value_name = "ID")]
    pub source: Option<RecordId>,

    /// Start of an ad hoc reminder window (RFC 3339); needs --window-end
    #[arg(long, value_name = "TIMESTAMP", requires = "window_end")]
    pub window_start: Option<DateTime<Utc>>,

    /// End of an ad hoc reminder window (RFC 3339); needs --window-start
    #[arg(long, value_name = "TIMESTAMP", requires = "window_start")]
    pub window_end: Option<DateTime<Utc>>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(provider = ?self.provider, "Starting run command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let dry_run = self.dry_run || config.application.dry_run;
        if dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - No data will be written to the store");
            println!();
        }

        let engine = match Self::build_engine(&config, dry_run) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialise engine");
                eprintln!("Failed to initialise engine: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let cancel = Cancellation::from_receiver(shutdown_signal);

        match self.provider {
            ProviderKind::Reminders => self.run_reminders(&config, &engine, cancel, dry_run).await,
            ProviderKind::Questionnaire => self.run_questionnaire(&config, &engine, cancel).await,
        }
    }

    fn build_engine(config: &GrantflowConfig, dry_run: bool) -> crate::domain::Result<Engine> {
        let store = WebApiStore::new(&config.store, dry_run)?;
        Engine::new(
            Arc::new(store),
            Arc::new(PagingCookieDecoder),
            &config.paging,
            &config.batch,
        )
    }

    async fn run_reminders(
        &self,
        config: &GrantflowConfig,
        engine: &Engine,
        cancel: Cancellation,
        dry_run: bool,
    ) -> anyhow::Result<i32> {
        let Some(reminders) = config.reminders.clone() else {
            eprintln!("No [reminders] section in the configuration");
            return Ok(EXIT_CONFIG);
        };
        let schedule = match RunSchedule::from_hours(reminders.interval_hours) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Invalid reminder schedule: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        let provider = match ReminderProvider::new(reminders) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Invalid reminder configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        // An explicit window is an ad hoc re-run and leaves the watermark alone
        if let (Some(start), Some(end)) = (self.window_start, self.window_end) {
            let window = match ReminderWindow::new(start, end) {
                Ok(w) => w,
                Err(e) => {
                    eprintln!("Invalid window: {e}");
                    return Ok(EXIT_CONFIG);
                }
            };
            tracing::info!(window = %window, "Using window from the command line");
            let ctx = RunContext::new(REMINDER_PROVIDER)
                .with_window(window)
                .with_cancellation(cancel.clone());
            let result = ProviderRunner::new(engine).run(&provider, ctx).await;
            return Ok(report(&result, cancel.is_cancelled()));
        }

        let storage = Arc::new(FileStateStorage::new(&config.state.directory));
        let state = StateManager::new(storage, dry_run);

        let window = match state
            .next_window(REMINDER_PROVIDER, &schedule, Utc::now())
            .await?
        {
            ScheduledWindow::Due(window) => window,
            ScheduledWindow::UpToDate => {
                tracing::info!("Reminder window already processed");
                println!("✅ Reminders are up to date; nothing to do");
                return Ok(EXIT_SUCCESS);
            }
        };

        println!("🚀 Sending reminders for {window}");
        let watermark = state.begin_run(REMINDER_PROVIDER).await?;

        let ctx = RunContext::new(REMINDER_PROVIDER)
            .with_window(window)
            .with_cancellation(cancel.clone());
        let result = ProviderRunner::new(engine).run(&provider, ctx).await;

        let interrupted = cancel.is_cancelled();
        state
            .finish_run(watermark, &window, &result, interrupted)
            .await?;

        Ok(report(&result, interrupted))
    }

    async fn run_questionnaire(
        &self,
        config: &GrantflowConfig,
        engine: &Engine,
        cancel: Cancellation,
    ) -> anyhow::Result<i32> {
        let Some(questionnaire) = config.questionnaire.clone() else {
            eprintln!("No [questionnaire] section in the configuration");
            return Ok(EXIT_CONFIG);
        };
        let Some(source) = self.source else {
            eprintln!("The questionnaire provider needs --source <ID>");
            return Ok(EXIT_CONFIG);
        };
        let provider = match QuestionnaireProvider::new(questionnaire) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Invalid questionnaire configuration: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("🚀 Copying questionnaire {source}");
        let ctx = RunContext::new(QUESTIONNAIRE_PROVIDER)
            .with_source(source)
            .with_cancellation(cancel.clone());
        let result = ProviderRunner::new(engine).run(&provider, ctx).await;

        Ok(report(&result, cancel.is_cancelled()))
    }
}

/// Print a run summary and pick the exit code
fn report(result: &ProcessResult, interrupted: bool) -> i32 {
    println!();
    println!("📊 Run Summary:");
    println!("  Status: {:?}", result.status);
    println!("  Processed: {}/{}", result.processed_count, result.total_count);

    if !result.errors.is_empty() {
        println!("  Errors: {}", result.errors.len());
        for error in result.errors.iter().take(10) {
            println!("    - {error}");
        }
        if result.errors.len() > 10 {
            println!("    ... and {} more", result.errors.len() - 10);
        }
    }
    println!();

    exit_code(result, interrupted)
}

/// Exit code for a finished run
pub fn exit_code(result: &ProcessResult, interrupted: bool) -> i32 {
    if interrupted && !result.is_success() {
        EXIT_INTERRUPTED
    } else {
        result.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{EXIT_PARTIAL, EXIT_RUN_FAILED};

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&ProcessResult::success(3), false), EXIT_SUCCESS);
        assert_eq!(
            exit_code(&ProcessResult::from_counts(2, 3, vec!["x".to_string()]), false),
            EXIT_PARTIAL
        );
        assert_eq!(
            exit_code(&ProcessResult::failure(3, vec!["x".to_string()]), false),
            EXIT_RUN_FAILED
        );
        assert_eq!(
            exit_code(&ProcessResult::failure(3, vec!["x".to_string()]), true),
            EXIT_INTERRUPTED
        );
        assert_eq!(exit_code(&ProcessResult::success(3), true), EXIT_SUCCESS);
    }
}
