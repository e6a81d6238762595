//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the grantflow configuration file.

use crate::cli::{EXIT_CONFIG, EXIT_SUCCESS};
use crate::config::load_config;
use crate::core::paging::QueryTemplate;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        // Queries must render with only the per-page placeholders bound
        if let Some(ref reminders) = config.reminders {
            if let Err(e) = QueryTemplate::new(reminders.query.clone()).render(1, 1, None) {
                println!("❌ reminders.query is not usable");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Store: {}{}", config.store.base_url, config.store.api_path);
        println!(
            "  Access Token: {}",
            if config.store.access_token.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!("  Page Size: {}", config.paging.page_size);
        println!("  Max Pages: {}", config.paging.max_pages);
        println!("  Chunk Size: {}", config.batch.chunk_size);
        println!("  State Directory: {}", config.state.directory);

        match config.reminders {
            Some(ref r) => println!(
                "  Reminders: {} -> {} (offsets {:?}, every {}h)",
                r.entity, r.notification_entity, r.offsets_days, r.interval_hours
            ),
            None => println!("  Reminders: not configured"),
        }
        match config.questionnaire {
            Some(ref q) => println!(
                "  Questionnaire copy: {} / {} / {} / {}",
                q.questionnaire_entity, q.section_entity, q.question_entity, q.rule_entity
            ),
            None => println!("  Questionnaire copy: not configured"),
        }
        println!();
        Ok(EXIT_SUCCESS)
    }
}
