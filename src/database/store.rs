//! Document store abstraction over events and their matches

use async_trait::async_trait;
use futures::stream::BoxStream;
use crate::models::{Event, CreateEventRequest, UpdateEventRequest, Match, NewMatch, UpdateMatchRequest};
use crate::utils::errors::Result;

/// Stream of full event snapshots. Dropping it unsubscribes.
pub type EventSnapshots = BoxStream<'static, Result<Event>>;
/// Stream of full match-set snapshots for one event. Dropping it unsubscribes.
pub type MatchSnapshots = BoxStream<'static, Result<Vec<Match>>>;

/// CRUD and change subscription over event and match records
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>>;

    /// Every event whose status is not terminal
    async fn list_active_events(&self) -> Result<Vec<Event>>;

    async fn create_event(&self, request: CreateEventRequest) -> Result<Event>;

    async fn update_event(&self, event_id: &str, update: UpdateEventRequest) -> Result<Event>;

    async fn get_match(&self, match_id: &str) -> Result<Option<Match>>;

    /// All matches owned by an event, ordered by round then court
    async fn get_matches(&self, event_id: &str) -> Result<Vec<Match>>;

    async fn create_matches(&self, matches: Vec<NewMatch>) -> Result<Vec<Match>>;

    async fn update_match(&self, match_id: &str, update: UpdateMatchRequest) -> Result<Match>;

    /// Delete one round. Returns the number of removed matches.
    async fn delete_round(&self, event_id: &str, round: u32) -> Result<u64>;

    /// Delete every round strictly after `round`
    async fn delete_rounds_after(&self, event_id: &str, round: u32) -> Result<u64>;

    async fn delete_matches(&self, event_id: &str) -> Result<u64>;

    /// Current snapshot first, then one snapshot per change
    async fn subscribe_event(&self, event_id: &str) -> Result<EventSnapshots>;

    /// Current match set first, then one snapshot per change
    async fn subscribe_matches(&self, event_id: &str) -> Result<MatchSnapshots>;
}
