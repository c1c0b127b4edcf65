//! Database service layer
//!
//! PostgreSQL-backed `EventStore`. Subscriptions re-read the event or its
//! matches whenever the change feed reports a write.

use std::time::Instant;
use async_trait::async_trait;
use tracing::warn;
use crate::database::{DatabasePool, EventRepository, MatchRepository};
use crate::database::connection::{ChangeChannel, ChangeListener};
use crate::database::store::{EventStore, EventSnapshots, MatchSnapshots};
use crate::models::{Event, CreateEventRequest, UpdateEventRequest, Match, NewMatch, UpdateMatchRequest};
use crate::utils::errors::{PadelTowerError, Result};
use crate::utils::logging::log_database_operation;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub events: EventRepository,
    pub matches: MatchRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            matches: MatchRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

/// Time a repository call and log it
async fn timed<T, F>(operation: &str, table: &str, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = fut.await;
    log_database_operation(operation, table, started.elapsed().as_millis() as u64, result.is_ok());
    result
}

#[async_trait]
impl EventStore for DatabaseService {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        timed("select", "events", self.events.find_by_id(event_id)).await
    }

    async fn list_active_events(&self) -> Result<Vec<Event>> {
        timed("select_active", "events", self.events.list_active()).await
    }

    async fn create_event(&self, request: CreateEventRequest) -> Result<Event> {
        timed("insert", "events", self.events.create(request)).await
    }

    async fn update_event(&self, event_id: &str, update: UpdateEventRequest) -> Result<Event> {
        timed("update", "events", self.events.update(event_id, update)).await
    }

    async fn get_match(&self, match_id: &str) -> Result<Option<Match>> {
        timed("select", "matches", self.matches.find_by_id(match_id)).await
    }

    async fn get_matches(&self, event_id: &str) -> Result<Vec<Match>> {
        timed("select_by_event", "matches", self.matches.find_by_event(event_id)).await
    }

    async fn create_matches(&self, matches: Vec<NewMatch>) -> Result<Vec<Match>> {
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        timed("insert", "matches", self.matches.create_many(matches)).await
    }

    async fn update_match(&self, match_id: &str, update: UpdateMatchRequest) -> Result<Match> {
        timed("update", "matches", self.matches.update(match_id, update)).await
    }

    async fn delete_round(&self, event_id: &str, round: u32) -> Result<u64> {
        timed("delete_round", "matches", self.matches.delete_round(event_id, round)).await
    }

    async fn delete_rounds_after(&self, event_id: &str, round: u32) -> Result<u64> {
        timed("delete_after_round", "matches", self.matches.delete_after_round(event_id, round)).await
    }

    async fn delete_matches(&self, event_id: &str) -> Result<u64> {
        timed("delete_by_event", "matches", self.matches.delete_by_event(event_id)).await
    }

    async fn subscribe_event(&self, event_id: &str) -> Result<EventSnapshots> {
        let mut changes = ChangeListener::connect(&self.pool, ChangeChannel::Events, event_id).await?;
        let initial = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| PadelTowerError::EventNotFound { event_id: event_id.to_string() })?;
        let events = self.events.clone();
        let event_id = event_id.to_string();

        let stream = async_stream::stream! {
            yield Ok(initial);
            loop {
                if let Err(e) = changes.changed().await {
                    warn!(event_id = %event_id, error = %e, "Event listener failed");
                    yield Err(e);
                    break;
                }
                match events.find_by_id(&event_id).await {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => break,
                    Err(e) => yield Err(e),
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn subscribe_matches(&self, event_id: &str) -> Result<MatchSnapshots> {
        let mut changes = ChangeListener::connect(&self.pool, ChangeChannel::Matches, event_id).await?;
        let initial = self.matches.find_by_event(event_id).await?;
        let matches = self.matches.clone();
        let event_id = event_id.to_string();

        let stream = async_stream::stream! {
            yield Ok(initial);
            loop {
                if let Err(e) = changes.changed().await {
                    warn!(event_id = %event_id, error = %e, "Match listener failed");
                    yield Err(e);
                    break;
                }
                yield matches.find_by_event(&event_id).await;
            }
        };
        Ok(Box::pin(stream))
    }
}
