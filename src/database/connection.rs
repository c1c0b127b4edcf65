//! PostgreSQL pool and change feed
//!
//! The triggers in `migrations/` publish the owning event id on one channel
//! per table. [`ChangeListener`] wraps a `PgListener` and wakes only for the
//! event it follows.

use std::time::Duration;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::{Pool, Postgres};
use tracing::{debug, info};
use crate::config::DatabaseConfig;
use crate::utils::errors::Result;

pub type DatabasePool = Pool<Postgres>;

/// Idle connections are dropped after this long
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!(max_connections = config.max_connections, "Event store pool ready");
    Ok(pool)
}

pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    info!("Running event store migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// NOTIFY channels written by the change triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeChannel {
    Events,
    Matches,
}

impl ChangeChannel {
    pub fn name(self) -> &'static str {
        match self {
            ChangeChannel::Events => "event_changes",
            ChangeChannel::Matches => "match_changes",
        }
    }
}

/// Change notifications for a single event
pub struct ChangeListener {
    listener: PgListener,
    channel: ChangeChannel,
    event_id: String,
}

impl ChangeListener {
    /// Start listening. Call before reading the initial snapshot so no change
    /// falls between the read and the first `changed`.
    pub async fn connect(pool: &DatabasePool, channel: ChangeChannel, event_id: &str) -> Result<Self> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(channel.name()).await?;
        debug!(channel = channel.name(), event_id = event_id, "Listening for changes");
        Ok(Self { listener, channel, event_id: event_id.to_string() })
    }

    /// Wait for the next notification about this event; others on the
    /// channel are skipped
    pub async fn changed(&mut self) -> Result<()> {
        loop {
            let notification = self.listener.recv().await?;
            if is_for_event(notification.payload(), &self.event_id) {
                return Ok(());
            }
            debug!(channel = self.channel.name(), payload = notification.payload(), "Change for another event");
        }
    }
}

fn is_for_event(payload: &str, event_id: &str) -> bool {
    payload.trim() == event_id
}
