//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{PadelTowerError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_lifecycle_config(&settings.lifecycle)?;
    validate_logging_config(&settings.logging)?;

    if settings.features.telegram_notifications {
        validate_telegram_config(&settings.telegram)?;
    }

    if settings.features.persist_prompt_dismissals {
        validate_redis_config(&settings.redis)?;
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(PadelTowerError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(PadelTowerError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(PadelTowerError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.acquire_timeout_seconds == 0 {
        return Err(PadelTowerError::Config(
            "Database acquire timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(PadelTowerError::Config(
            "Redis URL is required".to_string()
        ));
    }

    if config.ttl_seconds == 0 {
        return Err(PadelTowerError::Config(
            "Redis TTL must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate Telegram configuration
fn validate_telegram_config(config: &super::TelegramConfig) -> Result<()> {
    match &config.token {
        Some(token) if !token.is_empty() => {}
        _ => {
            return Err(PadelTowerError::Config(
                "Telegram token is required when telegram notifications are enabled".to_string()
            ));
        }
    }

    if config.admin_chat_ids.is_empty() {
        return Err(PadelTowerError::Config(
            "At least one admin chat ID must be configured".to_string()
        ));
    }

    Ok(())
}

/// Validate lifecycle configuration
fn validate_lifecycle_config(config: &super::LifecycleConfig) -> Result<()> {
    if config.poll_interval_seconds == 0 {
        return Err(PadelTowerError::Config(
            "Poll interval must be greater than 0".to_string()
        ));
    }

    if config.pairing_lead_minutes < 0 {
        return Err(PadelTowerError::Config(
            "Pairing lead cannot be negative".to_string()
        ));
    }

    if config.default_duration_minutes <= 0 {
        return Err(PadelTowerError::Config(
            "Default event duration must be greater than 0".to_string()
        ));
    }

    if config.default_rounds == 0 || config.default_max_courts == 0 {
        return Err(PadelTowerError::Config(
            "Default rounds and courts must be greater than 0".to_string()
        ));
    }

    if config.utc_offset_minutes.abs() > 14 * 60 {
        return Err(PadelTowerError::Config(
            format!("UTC offset out of range: {} minutes", config.utc_offset_minutes)
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(PadelTowerError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(PadelTowerError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
