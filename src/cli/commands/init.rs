//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use crate::cli::{EXIT_CONFIG, EXIT_FATAL, EXIT_SUCCESS};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "grantflow.toml")]
    pub output: String,

    /// Include provider sections with example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing grantflow configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set GRANTFLOW_STORE_TOKEN in your environment or a .env file");
                println!("  3. Validate configuration: grantflow validate-config");
                println!("  4. Run a provider: grantflow run reminders --dry-run");
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# grantflow configuration

environment = "development"

[application]
log_level = "info"
dry_run = false

[store]
base_url = "https://funding.example.com"
api_path = "/api/data/v9.2"
access_token = "${GRANTFLOW_STORE_TOKEN}"
timeout_seconds = 60
tls_verify = true

[paging]
page_size = 5000
max_pages = 10000

[batch]
chunk_size = 1000

[state]
directory = ".grantflow/state"

[logging]
local_enabled = true
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# grantflow configuration
#
# Every section except [store] is optional. Values of the form ${NAME} are
# replaced with environment variables when the file is loaded, and any
# GRANTFLOW_<SECTION>_<KEY> variable overrides the matching setting.

# development | staging | production
# Production requires TLS verification and an access token.
environment = "development"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Read and plan, but don't write to the store
dry_run = false

# ============================================================================
# Record Store
# ============================================================================
[store]
base_url = "https://funding.example.com"
api_path = "/api/data/v9.2"

# Bearer token (use an environment variable)
access_token = "${GRANTFLOW_STORE_TOKEN}"

timeout_seconds = 60
tls_verify = true

# Backoff for transient failures; writes are only retried when throttled
[store.retry]
max_retries = 3        # retries after the first attempt
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

# ============================================================================
# Reads and Writes
# ============================================================================
[paging]
# Records per page (1-5000)
page_size = 5000

# A read that needs more pages than this is treated as a runaway cursor
max_pages = 10000

[batch]
# Operations per batch call (1-1000)
chunk_size = 1000

[state]
# Where run-window watermarks are kept
directory = ".grantflow/state"

# ============================================================================
# Reminder Provider
# ============================================================================
[reminders]
entity = "applications"
id_field = "applicationid"

# {page}, {page_size} and {token} are filled in for every page
query = """
<fetch page='{page}' count='{page_size}' paging-cookie='{token}'>
  <entity name='application'>
    <attribute name='applicationid' />
    <attribute name='submitted_on' />
    <attribute name='ownerid' />
    <filter><condition attribute='statecode' operator='eq' value='0' /></filter>
  </entity>
</fetch>
"""

# Milestones are counted in days from the anchor; day 1 is the anchor day
anchor_field = "submitted_on"
offsets_days = [30, 60, 90]

# One notification per recipient per run
recipient_field = "_ownerid_value"
notification_entity = "notifications"

# Length of one run window; must divide 24
interval_hours = 24

# ============================================================================
# Questionnaire Copy Provider
# ============================================================================
[questionnaire]
name_field = "name"
copy_suffix = " (copy)"

# {source} is the template questionnaire id given with --source
questionnaire_query = "<fetch page='{page}' count='{page_size}' paging-cookie='{token}'><entity name='questionnaire'><all-attributes /><filter><condition attribute='questionnaireid' operator='eq' value='{source}' /></filter></entity></fetch>"
section_query = "<fetch page='{page}' count='{page_size}' paging-cookie='{token}'><entity name='questionnaire_section'><all-attributes /><filter><condition attribute='questionnaire' operator='eq' value='{source}' /></filter></entity></fetch>"
question_query = "<fetch page='{page}' count='{page_size}' paging-cookie='{token}'><entity name='question'><all-attributes /><link-entity name='questionnaire_section' from='questionnaire_sectionid' to='section'><filter><condition attribute='questionnaire' operator='eq' value='{source}' /></filter></link-entity></entity></fetch>"
rule_query = "<fetch page='{page}' count='{page_size}' paging-cookie='{token}'><entity name='business_rule'><all-attributes /><filter><condition attribute='questionnaire' operator='eq' value='{source}' /></filter></entity></fetch>"

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files next to the console output
local_enabled = true
local_path = "logs"

# daily | hourly
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrantflowConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "grantflow.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "grantflow.toml");
        assert!(!args.with_examples);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config: GrantflowConfig = toml::from_str(&InitArgs::generate_minimal_config()).unwrap();
        assert!(config.reminders.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config: GrantflowConfig =
            toml::from_str(&InitArgs::generate_config_with_examples()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.reminders.unwrap().offsets_days, vec![30, 60, 90]);
        assert!(config.questionnaire.is_some());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grantflow.toml");
        fs::write(&path, "existing").unwrap();

        let args = InitArgs {
            output: path.to_string_lossy().into_owned(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), EXIT_CONFIG);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");

        let args = InitArgs { force: true, ..args };
        assert_eq!(args.execute().await.unwrap(), EXIT_SUCCESS);
        assert!(fs::read_to_string(&path).unwrap().contains("[store]"));
    }
}
