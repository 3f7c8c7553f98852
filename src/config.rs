use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use validator::Validate;

use crate::core::{history::NEVER_MET_MONTHS, UnfavourablePairs};
use crate::models::RankingWeights;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Application configuration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub database: DatabaseSettings,
    #[serde(default)]
    #[validate(nested)]
    pub webhook: WebhookSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    #[validate(nested)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DatabaseSettings {
    #[validate(length(min = 1))]
    pub url: String,
    #[validate(range(min = 1))]
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WebhookSettings {
    /// Chat webhook; no messages are posted when unset
    #[validate(url)]
    pub url: Option<String>,
    #[serde(default = "default_webhook_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    #[validate(range(max = 10))]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}

fn default_webhook_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 500 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingSettings {
    /// First-name pairs that should rarely be matched, in any order or case
    #[serde(default)]
    pub unfavourable_pairs: Vec<[String; 2]>,
}

impl MatchingSettings {
    pub fn unfavourable(&self) -> UnfavourablePairs {
        UnfavourablePairs::new(self.unfavourable_pairs.iter().map(|[a, b]| (a, b)))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ScoringSettings {
    #[serde(default)]
    #[validate(nested)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WeightsConfig {
    #[serde(default = "default_meeting_count_weight")]
    #[validate(range(min = 0.0))]
    pub meeting_count: f64,
    #[serde(default = "default_never_met_months")]
    #[validate(range(min = 0))]
    pub never_met_months: i64,
    #[serde(default = "default_unfavourable_penalty")]
    #[validate(range(min = 0.0))]
    pub unfavourable_penalty: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            meeting_count: default_meeting_count_weight(),
            never_met_months: default_never_met_months(),
            unfavourable_penalty: default_unfavourable_penalty(),
        }
    }
}

impl From<&WeightsConfig> for RankingWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            meeting_count: config.meeting_count,
            never_met_months: config.never_met_months,
            unfavourable_penalty: config.unfavourable_penalty,
        }
    }
}

fn default_meeting_count_weight() -> f64 { 0.75 }
fn default_never_met_months() -> i64 { NEVER_MET_MONTHS }
fn default_unfavourable_penalty() -> f64 { 3.0 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSettings {
    /// Where members record that their catchup happened
    #[serde(default)]
    pub record_link: String,
    /// Appended to success messages so the chat shows a picture
    #[serde(default)]
    pub success_image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "full".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with COFFEE__)
    pub fn load() -> Result<Self, SettingsError> {
        let settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // e.g., COFFEE__WEBHOOK__URL -> webhook.url
            .add_source(environment())
            .build()?;

        Self::finish(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        Self::finish(settings)
    }

    /// [`load_from`](Self::load_from) when a path is given, otherwise [`load`](Self::load)
    pub fn load_with(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    fn finish(settings: Config) -> Result<Self, SettingsError> {
        let settings: Settings = substitute_env_vars(settings)?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn ranking_weights(&self) -> RankingWeights {
        RankingWeights::from(&self.scoring.weights)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("COFFEE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply the conventional single-variable overrides
///
/// `DATABASE_URL` and `COFFEE_WEBHOOK_URL` win over anything in files.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(webhook_url) = env::var("COFFEE_WEBHOOK_URL") {
        builder = builder.set_override("webhook.url", webhook_url)?;
    }

    builder.build()
}
