//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::GrantflowConfig;
use super::secret::secret_string;
use crate::domain::errors::EngineError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into GrantflowConfig
/// 4. Applies environment variable overrides (GRANTFLOW_* prefix)
/// 5. Validates the configuration
///
/// # Examples
///
/// ```no_run
/// use grantflow::config::loader::load_config;
///
/// let config = load_config("grantflow.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GrantflowConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EngineError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        EngineError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text
///
/// Same pipeline as [`load_config`] minus the file read.
pub fn parse_config(contents: &str) -> Result<GrantflowConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: GrantflowConfig = toml::from_str(&contents)
        .map_err(|e| EngineError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        EngineError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_regex();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(EngineError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the GRANTFLOW_* prefix
///
/// Variables follow the pattern GRANTFLOW_<SECTION>_<KEY>, for example
/// GRANTFLOW_STORE_BASE_URL or GRANTFLOW_BATCH_CHUNK_SIZE.
fn apply_env_overrides(config: &mut GrantflowConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("GRANTFLOW_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("GRANTFLOW_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Store overrides
    if let Ok(val) = std::env::var("GRANTFLOW_STORE_BASE_URL") {
        config.store.base_url = val;
    }
    if let Ok(val) = std::env::var("GRANTFLOW_STORE_API_PATH") {
        config.store.api_path = val;
    }
    if let Ok(val) = std::env::var("GRANTFLOW_STORE_ACCESS_TOKEN") {
        config.store.access_token = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("GRANTFLOW_STORE_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.store.timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("GRANTFLOW_STORE_TLS_VERIFY") {
        config.store.tls_verify = val.parse().unwrap_or(true);
    }

    // Paging overrides
    if let Ok(val) = std::env::var("GRANTFLOW_PAGING_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.paging.page_size = size;
        }
    }
    if let Ok(val) = std::env::var("GRANTFLOW_PAGING_MAX_PAGES") {
        if let Ok(pages) = val.parse() {
            config.paging.max_pages = pages;
        }
    }

    // Batch overrides
    if let Ok(val) = std::env::var("GRANTFLOW_BATCH_CHUNK_SIZE") {
        if let Ok(size) = val.parse() {
            config.batch.chunk_size = size;
        }
    }

    // State overrides
    if let Ok(val) = std::env::var("GRANTFLOW_STATE_DIRECTORY") {
        config.state.directory = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("GRANTFLOW_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("GRANTFLOW_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
