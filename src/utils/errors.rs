//! Error handling for PadelTower
//!
//! This module defines the main error type used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for PadelTower
#[derive(Error, Debug)]
pub enum PadelTowerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: String },

    #[error("Participant {participant_id} not found in event {event_id}")]
    ParticipantNotFound { event_id: String, participant_id: String },

    #[error("Participant {participant_id} is already enrolled in event {event_id}")]
    AlreadyEnrolled { event_id: String, participant_id: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Round limit reached: round {round} exceeds the configured {max_rounds} rounds")]
    RoundLimitReached { round: u32, max_rounds: u32 },

    #[error("Round {round} still has unfinished matches")]
    RoundIncomplete { round: u32 },

    #[error("Operator confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for PadelTower operations
pub type Result<T> = std::result::Result<T, PadelTowerError>;

impl PadelTowerError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            PadelTowerError::Database(_) => true,
            PadelTowerError::Migration(_) => false,
            PadelTowerError::Telegram(_) => true,
            PadelTowerError::Redis(_) => true,
            PadelTowerError::Config(_) => false,
            PadelTowerError::PermissionDenied(_) => false,
            PadelTowerError::Network(_) => true,
            PadelTowerError::EventNotFound { .. } => false,
            PadelTowerError::MatchNotFound { .. } => false,
            PadelTowerError::ParticipantNotFound { .. } => false,
            PadelTowerError::AlreadyEnrolled { .. } => false,
            PadelTowerError::InvalidStateTransition { .. } => false,
            PadelTowerError::InvalidSchedule(_) => false,
            PadelTowerError::RoundLimitReached { .. } => false,
            PadelTowerError::RoundIncomplete { .. } => true,
            PadelTowerError::ConfirmationRequired(_) => true,
            PadelTowerError::Serialization(_) => false,
            PadelTowerError::Io(_) => true,
            PadelTowerError::InvalidInput(_) => false,
            PadelTowerError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PadelTowerError::Migration(_) => ErrorSeverity::Critical,
            PadelTowerError::Config(_) => ErrorSeverity::Critical,
            PadelTowerError::PermissionDenied(_) => ErrorSeverity::Warning,
            PadelTowerError::InvalidSchedule(_) => ErrorSeverity::Warning,
            PadelTowerError::RoundLimitReached { .. } => ErrorSeverity::Info,
            PadelTowerError::RoundIncomplete { .. } => ErrorSeverity::Info,
            PadelTowerError::ConfirmationRequired(_) => ErrorSeverity::Info,
            PadelTowerError::AlreadyEnrolled { .. } => ErrorSeverity::Info,
            PadelTowerError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Text shown to the operator whose action failed
    pub fn user_message(&self) -> String {
        match self {
            PadelTowerError::PermissionDenied(_) => "You do not have permission to change this record.".to_string(),
            PadelTowerError::Database(_) | PadelTowerError::Network(_) | PadelTowerError::ServiceUnavailable(_) => {
                "Could not reach the server, please try again.".to_string()
            }
            PadelTowerError::RoundIncomplete { round } => {
                format!("Round {} has unfinished matches. Finish them first.", round)
            }
            PadelTowerError::RoundLimitReached { max_rounds, .. } => {
                format!("The limit of {} rounds has been reached.", max_rounds)
            }
            other => other.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
