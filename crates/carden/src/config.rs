//! Configuration parsing
//!
//! Reads settings from `$CARDEN_HOME/config.toml` (default `~/.carden`).
//! A missing file or a missing section falls back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::ModelConfig;

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardenConfig {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub database: DatabaseConfig,
}

impl CardenConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.generation.max_cards_per_batch == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_cards_per_batch must be at least 1".to_string(),
            ));
        }
        if self.generation.default_card_count == 0
            || self.generation.default_card_count > self.generation.max_cards_per_batch
        {
            return Err(ConfigError::Invalid(format!(
                "generation.default_card_count must be between 1 and {}",
                self.generation.max_cards_per_batch
            )));
        }
        if self.model.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("model.timeout_seconds must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Batch and deck ceilings
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Largest `count` a single request may ask for
    #[serde(default = "default_max_cards_per_batch")]
    pub max_cards_per_batch: u32,

    /// Count used when a caller does not give one
    #[serde(default = "default_card_count")]
    pub default_card_count: u32,

    /// Capacity given to decks created without an explicit one
    #[serde(default = "default_max_cards_per_deck")]
    pub max_cards_per_deck: i64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_cards_per_batch: default_max_cards_per_batch(),
            default_card_count: default_card_count(),
            max_cards_per_deck: default_max_cards_per_deck(),
        }
    }
}

/// Model provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    /// Provider: "gemini" (default)
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound on a single model call (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,

    #[serde(default = "default_generation_max_tokens")]
    pub generation_max_tokens: u32,

    #[serde(default = "default_validation_temperature")]
    pub validation_temperature: f32,

    #[serde(default = "default_validation_max_tokens")]
    pub validation_max_tokens: u32,
}

impl ModelSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Call settings for topic moderation.
    pub fn validation_config(&self) -> ModelConfig {
        ModelConfig::with_model(&self.model)
            .temperature(self.validation_temperature)
            .max_tokens(self.validation_max_tokens)
            .json()
    }

    /// Call settings for card generation.
    pub fn generation_config(&self) -> ModelConfig {
        ModelConfig::with_model(&self.model)
            .temperature(self.generation_temperature)
            .max_tokens(self.generation_max_tokens)
            .json()
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            generation_temperature: default_generation_temperature(),
            generation_max_tokens: default_generation_max_tokens(),
            validation_temperature: default_validation_temperature(),
            validation_max_tokens: default_validation_max_tokens(),
        }
    }
}

/// Database location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

// Default value functions
fn default_max_cards_per_batch() -> u32 { 15 }
fn default_card_count() -> u32 { 10 }
fn default_max_cards_per_deck() -> i64 { carden_db::DEFAULT_MAX_CARDS }
fn default_provider() -> String { "gemini".to_string() }
fn default_model() -> String { "gemini-2.0-flash-exp".to_string() }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_timeout_seconds() -> u64 { 60 }
fn default_generation_temperature() -> f32 { 0.7 }
fn default_generation_max_tokens() -> u32 { 8192 }
fn default_validation_temperature() -> f32 { 0.1 }
fn default_validation_max_tokens() -> u32 { 1024 }
fn default_database_path() -> PathBuf { carden_logging::carden_home().join("carden.sqlite3") }

/// Load configuration from a file
pub fn load_config(config_path: &Path) -> Result<CardenConfig> {
    if !config_path.exists() {
        return Ok(CardenConfig::default());
    }

    let content = std::fs::read_to_string(config_path)?;
    let config: CardenConfig = toml::from_str(&content)?;
    config.validate()?;

    Ok(config)
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    carden_logging::carden_home().join("config.toml")
}
