//! Configuration schema types
//!
//! This module defines the configuration structure that maps to `grantflow.toml`.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};

/// Upper bound the record store places on one batch call
pub const MAX_CHUNK_SIZE: usize = 1000;

/// Upper bound the record store places on one query page
pub const MAX_PAGE_SIZE: usize = 5000;

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantflowConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Remote record store connection
    pub store: StoreConfig,

    /// Paged read settings
    #[serde(default)]
    pub paging: PagingConfig,

    /// Batched write settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Run-window state persistence
    #[serde(default)]
    pub state: StateConfig,

    /// Reminder provider settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<ReminderConfig>,

    /// Questionnaire copy provider settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questionnaire: Option<QuestionnaireConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GrantflowConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate(&self.environment)?;
        self.paging.validate()?;
        self.batch.validate()?;
        self.state.validate()?;
        if let Some(ref reminders) = self.reminders {
            reminders.validate()?;
        }
        if let Some(ref questionnaire) = self.questionnaire {
            questionnaire.validate()?;
        }
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (read and plan, but don't write)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Retry configuration for transport-level failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt of a request
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 || self.max_retries > 10 {
            return Err(format!(
                "store.retry.max_retries must be between 1 and 10, got {}",
                self.max_retries
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "store.retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }

    /// Delay before the given retry attempt (1-based)
    pub fn delay_for_attempt(&self, attempt: usize) -> u64 {
        let factor = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1).min(30) as i32);
        let delay = (self.initial_delay_ms as f64 * factor) as u64;
        delay.min(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Remote record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the record store organisation
    pub base_url: String,

    /// Path of the data API below the base URL
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Pre-acquired bearer token
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub access_token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification enabled
    ///
    /// Must stay `true` in production (enforced by validation).
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl StoreConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.base_url.is_empty() {
            return Err("store.base_url cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("store.base_url must start with http:// or https://".to_string());
        }

        if !self.api_path.starts_with('/') {
            return Err(format!(
                "store.api_path must start with '/', got '{}'",
                self.api_path
            ));
        }

        if self.timeout_seconds == 0 {
            return Err("store.timeout_seconds must be > 0".to_string());
        }

        if *environment == Environment::Production {
            if !self.tls_verify {
                return Err(
                    "TLS certificate verification cannot be disabled in production environments"
                        .to_string(),
                );
            }

            let has_token = self
                .access_token
                .as_ref()
                .map(|t| !t.expose_secret().is_empty())
                .unwrap_or(false);
            if !has_token {
                return Err("store.access_token is required in production environments".to_string());
            }
        }

        self.retry.validate()?;
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_path: default_api_path(),
            access_token: None,
            timeout_seconds: default_timeout_seconds(),
            tls_verify: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Paged read configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pages after which a read is abandoned as runaway
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl PagingConfig {
    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(format!(
                "paging.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }

        if self.max_pages == 0 {
            return Err("paging.max_pages must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

/// Batched write configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Operations per batch call
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl BatchConfig {
    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(format!(
                "batch.chunk_size must be between 1 and {MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            ));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// State management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding run-window watermark files
    #[serde(default = "default_state_directory")]
    pub directory: String,
}

impl StateConfig {
    fn validate(&self) -> Result<(), String> {
        if self.directory.trim().is_empty() {
            return Err("state.directory cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            directory: default_state_directory(),
        }
    }
}

/// Reminder provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Record type that carries the anchor dates
    pub entity: String,

    /// Primary key field of `entity`
    pub id_field: String,

    /// Paged query selecting candidate records
    pub query: String,

    /// Field holding the anchor timestamp
    pub anchor_field: String,

    /// Signed milestone offsets in days
    pub offsets_days: Vec<i64>,

    /// Field identifying the recipient (deduplication key)
    pub recipient_field: String,

    /// Record type created for each due recipient
    pub notification_entity: String,

    /// Length of one scheduled run window in hours
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
}

impl ReminderConfig {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("reminders.entity", &self.entity),
            ("reminders.id_field", &self.id_field),
            ("reminders.query", &self.query),
            ("reminders.anchor_field", &self.anchor_field),
            ("reminders.recipient_field", &self.recipient_field),
            ("reminders.notification_entity", &self.notification_entity),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} cannot be empty"));
            }
        }

        if self.offsets_days.is_empty() {
            return Err("reminders.offsets_days cannot be empty".to_string());
        }

        if self.interval_hours == 0 || 24 % self.interval_hours != 0 {
            return Err(format!(
                "reminders.interval_hours must divide 24, got {}",
                self.interval_hours
            ));
        }

        Ok(())
    }
}

/// Questionnaire copy provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireConfig {
    /// Root record type
    #[serde(default = "default_questionnaire_entity")]
    pub questionnaire_entity: String,

    /// Primary key field of the root record type
    #[serde(default = "default_questionnaire_id_field")]
    pub questionnaire_id_field: String,

    /// Section record type
    #[serde(default = "default_section_entity")]
    pub section_entity: String,

    /// Primary key field of the section record type
    #[serde(default = "default_section_id_field")]
    pub section_id_field: String,

    /// Question record type
    #[serde(default = "default_question_entity")]
    pub question_entity: String,

    /// Primary key field of the question record type
    #[serde(default = "default_question_id_field")]
    pub question_id_field: String,

    /// Business rule record type
    #[serde(default = "default_rule_entity")]
    pub rule_entity: String,

    /// Primary key field of the business rule record type
    #[serde(default = "default_rule_id_field")]
    pub rule_id_field: String,

    /// Lookup from sections and rules to their questionnaire
    #[serde(default = "default_questionnaire_lookup")]
    pub questionnaire_lookup: String,

    /// Lookup from questions to their section
    #[serde(default = "default_section_lookup")]
    pub section_lookup: String,

    /// Lookup from rules to the question they guard
    #[serde(default = "default_question_lookup")]
    pub question_lookup: String,

    /// Field holding the display name of the root record
    #[serde(default = "default_name_field")]
    pub name_field: String,

    /// Suffix appended to the copied root record's name
    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,

    /// Fields never copied from the template records
    #[serde(default = "default_excluded_fields")]
    pub excluded_fields: Vec<String>,

    /// Query selecting the template questionnaire (binds `{source}`)
    pub questionnaire_query: String,

    /// Query selecting the template's sections (binds `{source}`)
    pub section_query: String,

    /// Query selecting the template's questions (binds `{source}`)
    pub question_query: String,

    /// Query selecting the template's business rules (binds `{source}`)
    pub rule_query: String,
}

impl QuestionnaireConfig {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("questionnaire.questionnaire_query", &self.questionnaire_query),
            ("questionnaire.section_query", &self.section_query),
            ("questionnaire.question_query", &self.question_query),
            ("questionnaire.rule_query", &self.rule_query),
        ] {
            if !value.contains("{source}") {
                return Err(format!("{name} must reference the {{source}} placeholder"));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when file logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_path() -> String {
    "/api/data/v9.2".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_max_pages() -> usize {
    10_000
}

fn default_chunk_size() -> usize {
    MAX_CHUNK_SIZE
}

fn default_state_directory() -> String {
    ".grantflow/state".to_string()
}

fn default_interval_hours() -> u32 {
    24
}

fn default_questionnaire_entity() -> String {
    "questionnaires".to_string()
}

fn default_questionnaire_id_field() -> String {
    "questionnaireid".to_string()
}

fn default_section_entity() -> String {
    "questionnaire_sections".to_string()
}

fn default_section_id_field() -> String {
    "questionnaire_sectionid".to_string()
}

fn default_question_entity() -> String {
    "questions".to_string()
}

fn default_question_id_field() -> String {
    "questionid".to_string()
}

fn default_rule_entity() -> String {
    "business_rules".to_string()
}

fn default_rule_id_field() -> String {
    "business_ruleid".to_string()
}

fn default_questionnaire_lookup() -> String {
    "questionnaire".to_string()
}

fn default_section_lookup() -> String {
    "section".to_string()
}

fn default_question_lookup() -> String {
    "question".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_copy_suffix() -> String {
    " (copy)".to_string()
}

fn default_excluded_fields() -> Vec<String> {
    [
        "createdon",
        "modifiedon",
        "createdby",
        "modifiedby",
        "versionnumber",
        "statecode",
        "statuscode",
        "ownerid",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
