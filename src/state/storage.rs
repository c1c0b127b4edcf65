//! Prompt dismissal storage
//!
//! Dismissed round prompts survive a restart when a [`DismissalStore`] is
//! configured. The Redis implementation keeps one JSON value per event with
//! the configured TTL.

use std::collections::HashMap;
use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, error};
use crate::config::RedisConfig;
use crate::lifecycle::rounds::PromptDismissal;
use crate::utils::errors::Result;

#[async_trait]
pub trait DismissalStore: Send + Sync {
    async fn save(&self, event_id: &str, dismissal: PromptDismissal) -> Result<()>;

    async fn load(&self, event_id: &str) -> Result<Option<PromptDismissal>>;

    async fn clear(&self, event_id: &str) -> Result<()>;
}

/// Redis-based dismissal storage
#[derive(Clone)]
pub struct RedisDismissalStore {
    /// Redis connection manager
    connection_manager: redis::aio::ConnectionManager,
    /// Redis configuration
    config: RedisConfig,
}

impl RedisDismissalStore {
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            config,
        })
    }

    fn key(&self, event_id: &str) -> String {
        format!("{}prompt_dismissal:{}", self.config.prefix, event_id)
    }

    /// Check Redis connectivity
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl DismissalStore for RedisDismissalStore {
    async fn save(&self, event_id: &str, dismissal: PromptDismissal) -> Result<()> {
        let key = self.key(event_id);
        let serialized = serde_json::to_string(&dismissal)?;
        let mut conn = self.connection_manager.clone();

        match conn.set_ex::<_, _, ()>(&key, serialized, self.config.ttl_seconds).await {
            Ok(_) => {
                debug!(event_id = event_id, round = dismissal.round, "Prompt dismissal saved to Redis");
                Ok(())
            }
            Err(e) => {
                error!(event_id = event_id, error = %e, "Failed to save prompt dismissal to Redis");
                Err(e.into())
            }
        }
    }

    async fn load(&self, event_id: &str) -> Result<Option<PromptDismissal>> {
        let key = self.key(event_id);
        let mut conn = self.connection_manager.clone();

        let serialized: Option<String> = conn.get(&key).await?;
        match serialized {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn clear(&self, event_id: &str) -> Result<()> {
        let key = self.key(event_id);
        let mut conn = self.connection_manager.clone();
        conn.del::<_, ()>(&key).await?;
        debug!(event_id = event_id, "Prompt dismissal cleared from Redis");
        Ok(())
    }
}

/// Process-local dismissal storage
#[derive(Debug, Default)]
pub struct MemoryDismissalStore {
    entries: RwLock<HashMap<String, PromptDismissal>>,
}

impl MemoryDismissalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DismissalStore for MemoryDismissalStore {
    async fn save(&self, event_id: &str, dismissal: PromptDismissal) -> Result<()> {
        self.entries.write().await.insert(event_id.to_string(), dismissal);
        Ok(())
    }

    async fn load(&self, event_id: &str) -> Result<Option<PromptDismissal>> {
        Ok(self.entries.read().await.get(event_id).copied())
    }

    async fn clear(&self, event_id: &str) -> Result<()> {
        self.entries.write().await.remove(event_id);
        Ok(())
    }
}
