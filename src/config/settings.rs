//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub telegram: TelegramConfig,
    pub lifecycle: LifecycleConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Ticks run every few seconds; a pool wait longer than this fails the tick
    pub acquire_timeout_seconds: u64,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Telegram delivery configuration for operator notifications
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub admin_chat_ids: Vec<i64>,
    pub language: String,
}

/// Event lifecycle tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifecycleConfig {
    /// Polling cadence of the scheduler
    pub poll_interval_seconds: u64,
    /// How long before the start a full event moves to pairing
    pub pairing_lead_minutes: i64,
    /// Event duration when neither a time range nor `time_end` is given
    pub default_duration_minutes: i64,
    pub default_rounds: u32,
    pub default_max_courts: u32,
    /// Offset of the club's wall clock from UTC; schedule fields use it
    pub utc_offset_minutes: i32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub auto_transitions: bool,
    pub telegram_notifications: bool,
    pub persist_prompt_dismissals: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(config::File::with_name("config").required(false))
    }

    /// Load settings from an explicit file, still honouring environment overrides
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        Self::load(config::File::from(path).required(true))
    }

    fn load<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(config::Environment::with_prefix("PADELTOWER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::PadelTowerError> {
        super::validation::validate_settings(self)
    }
}

impl LifecycleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn pairing_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.pairing_lead_minutes)
    }

    pub fn default_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.default_duration_minutes)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
            pairing_lead_minutes: 180,
            default_duration_minutes: 120,
            default_rounds: 6,
            default_max_courts: 4,
            utc_offset_minutes: 60,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/padeltower".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 10,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "padeltower:".to_string(),
                ttl_seconds: 86400,
            },
            telegram: TelegramConfig {
                token: None,
                api_url: None,
                admin_chat_ids: vec![],
                language: "es".to_string(),
            },
            lifecycle: LifecycleConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/padeltower".to_string(),
                json: false,
            },
            features: FeaturesConfig {
                auto_transitions: true,
                telegram_notifications: false,
                persist_prompt_dismissals: false,
            },
        }
    }
}
