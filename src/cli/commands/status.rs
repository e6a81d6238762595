//! Status command implementation
//!
//! This module implements the `status` command for displaying the
//! run-window watermarks of scheduled providers.

use crate::cli::{EXIT_CONFIG, EXIT_FATAL, EXIT_SUCCESS};
use crate::config::load_config;
use crate::core::state::{FileStateStorage, RunStatus, StateManager};
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this provider
    #[arg(long)]
    pub provider: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking run status");

        println!("📊 Run Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let storage = Arc::new(FileStateStorage::new(&config.state.directory));
        let state_manager = StateManager::new(storage, true);

        let watermarks = match state_manager.get_all_watermarks().await {
            Ok(w) => w,
            Err(e) => {
                println!("❌ Failed to load watermarks");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let watermarks: Vec<_> = watermarks
            .iter()
            .filter(|w| self.provider.as_ref().map_or(true, |p| &w.id == p))
            .collect();

        if watermarks.is_empty() {
            println!("No run history found.");
            println!("Run 'grantflow run reminders' to process the first window.");
            return Ok(EXIT_SUCCESS);
        }

        println!("Found {} watermark(s):", watermarks.len());
        println!();
        println!(
            "{:<16} {:<16} {:<6} {:<22} {:<22}",
            "Provider", "Status", "Runs", "Window End", "Last Finished"
        );
        println!("{}", "-".repeat(86));

        for watermark in watermarks {
            let status = match watermark.last_run_status {
                RunStatus::Completed => "✅ Completed",
                RunStatus::InProgress => "🔄 In Progress",
                RunStatus::Failed => "❌ Failed",
                RunStatus::Interrupted => "⏹️  Interrupted",
                RunStatus::NotStarted => "⏸️  Not Started",
            };
            let format = |ts: Option<chrono::DateTime<chrono::Utc>>| {
                ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "Never".to_string())
            };

            println!(
                "{:<16} {:<16} {:<6} {:<22} {:<22}",
                watermark.id,
                status,
                watermark.runs_completed,
                format(watermark.last_window_end),
                format(watermark.last_run_completed_at)
            );
        }

        println!();
        Ok(EXIT_SUCCESS)
    }
}
