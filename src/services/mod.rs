//! Services module
//!
//! This module contains business logic services

pub mod matchmaking;
pub mod notification;
pub mod participant;

// Re-export commonly used services
pub use matchmaking::{MatchGenerator, PozoMatchGenerator, RoundPlan};
pub use notification::{LogNotifier, MessageTemplate, Notification, NotificationKind, NotificationService, NotificationSink, NotificationStats};
pub use participant::{Enrollment, ParticipantService, Withdrawal};

use std::sync::Arc;
use tracing::info;
use crate::config::settings::Settings;
use crate::database::{health_check, DatabaseService, EventStore};
use crate::lifecycle::EventLifecycleCoordinator;
use crate::state::{DismissalStore, RedisDismissalStore};
use crate::utils::clock::Clock;
use crate::utils::errors::Result;

/// Service factory wiring the lifecycle coordinator from settings
#[derive(Clone)]
pub struct ServiceFactory {
    pub database: DatabaseService,
    pub generator: Arc<dyn MatchGenerator>,
    pub notifier: Arc<dyn NotificationSink>,
    pub dismissals: Option<RedisDismissalStore>,
    settings: Settings,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub async fn new(settings: Settings, database: DatabaseService) -> Result<Self> {
        let notifier: Arc<dyn NotificationSink> = if settings.features.telegram_notifications {
            info!(chats = settings.telegram.admin_chat_ids.len(), "Telegram notifications enabled");
            Arc::new(NotificationService::from_config(&settings.telegram)?)
        } else {
            info!("Telegram notifications disabled, notifications go to the log");
            Arc::new(LogNotifier)
        };

        let dismissals = if settings.features.persist_prompt_dismissals {
            Some(RedisDismissalStore::new(settings.redis.clone()).await?)
        } else {
            None
        };

        Ok(Self {
            database,
            generator: Arc::new(PozoMatchGenerator::new()),
            notifier,
            dismissals,
            settings,
        })
    }

    /// Build the coordinator over the database store
    pub fn coordinator(&self, clock: Arc<dyn Clock>) -> Result<EventLifecycleCoordinator> {
        let store: Arc<dyn EventStore> = Arc::new(self.database.clone());
        let mut coordinator = EventLifecycleCoordinator::new(
            store,
            self.generator.clone(),
            self.notifier.clone(),
            clock,
            &self.settings.lifecycle,
        )?
        .with_auto_transitions(self.settings.features.auto_transitions);

        if let Some(dismissals) = &self.dismissals {
            let dismissals: Arc<dyn DismissalStore> = Arc::new(dismissals.clone());
            coordinator = coordinator.with_dismissal_store(dismissals);
        }

        Ok(coordinator)
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = health_check(self.database.pool()).await.is_ok();
        let redis_healthy = match &self.dismissals {
            Some(store) => Some(store.health_check().await.unwrap_or(false)),
            None => None,
        };

        ServiceHealthStatus {
            database_healthy,
            redis_healthy,
            telegram_enabled: self.settings.features.telegram_notifications,
            auto_transitions: self.settings.features.auto_transitions,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    /// `None` when dismissals are not persisted
    pub redis_healthy: Option<bool>,
    pub telegram_enabled: bool,
    pub auto_transitions: bool,
}

impl ServiceHealthStatus {
    /// Check if all critical services are healthy
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if self.redis_healthy == Some(false) {
            issues.push("Redis connection failed".to_string());
        }
        if !self.auto_transitions {
            issues.push("Automatic transitions disabled".to_string());
        }

        issues
    }
}
