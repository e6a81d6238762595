//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for grantflow using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Exit code: every operation succeeded
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code: some operations failed
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code: configuration could not be loaded or is invalid
pub const EXIT_CONFIG: i32 = 2;
/// Exit code: the run failed
pub const EXIT_RUN_FAILED: i32 = 3;
/// Exit code: the run was stopped by a shutdown signal
pub const EXIT_INTERRUPTED: i32 = 4;
/// Exit code: unexpected error
pub const EXIT_FATAL: i32 = 5;

/// grantflow - process-provider execution engine for a remote record store
#[derive(Parser, Debug)]
#[command(name = "grantflow")]
#[command(version, about, long_about = None)]
#[command(author = "Grantflow Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "grantflow.toml", env = "GRANTFLOW_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "GRANTFLOW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one invocation of a provider
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show run-window watermarks
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::run::ProviderKind;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["grantflow", "run", "reminders"]);
        assert_eq!(cli.config, "grantflow.toml");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.provider, ProviderKind::Reminders);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_run_questionnaire_with_source() {
        let cli = Cli::parse_from([
            "grantflow",
            "run",
            "questionnaire",
            "--source",
            "6f1c1d5e-3f3e-4d0a-9a53-0c3c1f3c9a10",
            "--dry-run",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.provider, ProviderKind::Questionnaire);
                assert!(args.dry_run);
                assert!(args.source.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_source() {
        let result = Cli::try_parse_from(["grantflow", "run", "questionnaire", "--source", "nope"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_window_override() {
        let cli = Cli::parse_from([
            "grantflow",
            "run",
            "reminders",
            "--window-start",
            "2024-01-30T00:00:00Z",
            "--window-end",
            "2024-01-31T00:00:00Z",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.window_start.is_some());
                assert!(args.window_end.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["grantflow", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["grantflow", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["grantflow", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
