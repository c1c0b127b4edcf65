//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the PadelTower application.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::models::EventStatus;
use crate::utils::errors::{PadelTowerError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer when dropped and must be kept
/// alive for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "padeltower.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(non_blocking).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking).boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .try_init()
        .map_err(|e| PadelTowerError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log an event status transition
pub fn log_transition(event_id: &str, from: EventStatus, to: EventStatus, automatic: bool) {
    info!(
        event_id = event_id,
        from = %from,
        to = %to,
        automatic = automatic,
        "Event status transition"
    );
}

/// Log the outcome of a round generation
pub fn log_round_generation(event_id: &str, round: u32, matches: usize, replaced: u64) {
    info!(
        event_id = event_id,
        round = round,
        matches = matches,
        replaced = replaced,
        "Round generated"
    );
}

/// Log operator-initiated actions
pub fn log_operator_action(action: &str, target: &str, details: Option<&str>) {
    warn!(
        action = action,
        target = target,
        details = details,
        "Operator action performed"
    );
}

/// Log store failures with context
pub fn log_store_error(operation: &str, target: &str, error: &PadelTowerError) {
    if error.is_recoverable() {
        warn!(
            operation = operation,
            target = target,
            error = %error,
            "Store operation failed, will retry on next tick"
        );
    } else {
        error!(
            operation = operation,
            target = target,
            error = %error,
            severity = %error.severity(),
            "Store operation failed"
        );
    }
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
