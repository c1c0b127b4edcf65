//! In-process event store
//!
//! Keeps every record in memory and pushes change notifications through a
//! broadcast channel. Used for embedding and by the test suite.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use crate::database::store::{EventStore, EventSnapshots, MatchSnapshots};
use crate::models::{Event, EventStatus, CreateEventRequest, UpdateEventRequest, Match, NewMatch, UpdateMatchRequest};
use crate::utils::errors::{PadelTowerError, Result};
use crate::utils::helpers::generate_uuid;

#[derive(Debug, Clone)]
enum StoreChange {
    Event(String),
    Matches(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    events: HashMap<String, Event>,
    /// Insertion order is kept so duplicated records read back first-seen first
    matches: Vec<Match>,
}

#[derive(Debug, Clone)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
    changes: broadcast::Sender<StoreChange>,
    fail_writes: Arc<AtomicBool>,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            changes,
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Insert or replace a complete event record
    pub async fn insert_event(&self, event: Event) {
        let id = event.id.clone();
        self.state.write().await.events.insert(id.clone(), event);
        self.notify(StoreChange::Event(id));
    }

    /// Append a raw match record, bypassing id assignment
    pub async fn insert_match(&self, record: Match) {
        let event_id = record.event_id.clone();
        self.state.write().await.matches.push(record);
        self.notify(StoreChange::Matches(event_id));
    }

    /// Make every subsequent write fail with a permission error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, target: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PadelTowerError::PermissionDenied(target.to_string()));
        }
        Ok(())
    }

    fn notify(&self, change: StoreChange) {
        // No receivers just means nobody is subscribed
        let _ = self.changes.send(change);
    }

    fn sorted_matches(state: &MemoryState, event_id: &str) -> Vec<Match> {
        let mut matches: Vec<Match> = state
            .matches
            .iter()
            .filter(|m| m.event_id == event_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round, m.court));
        matches
    }

    async fn remove_matches<F>(&self, event_id: &str, predicate: F) -> Result<u64>
    where
        F: Fn(&Match) -> bool,
    {
        self.check_writable(&format!("matches/{}", event_id))?;
        let removed = {
            let mut state = self.state.write().await;
            let before = state.matches.len();
            state.matches.retain(|m| !(m.event_id == event_id && predicate(m)));
            (before - state.matches.len()) as u64
        };
        if removed > 0 {
            self.notify(StoreChange::Matches(event_id.to_string()));
        }
        Ok(removed)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(event_id).cloned())
    }

    async fn list_active_events(&self) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| !e.status.is_terminal())
            .cloned()
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn create_event(&self, request: CreateEventRequest) -> Result<Event> {
        self.check_writable("events")?;
        let now = Utc::now();
        let event = Event {
            id: generate_uuid(),
            kind: request.kind,
            name: request.name,
            status: EventStatus::Open,
            date: request.date,
            time: request.time,
            time_end: request.time_end,
            players: Vec::new(),
            waitlist: Vec::new(),
            max_courts: request.max_courts,
            rounds: request.rounds,
            auto_started_at: None,
            created_at: now,
            updated_at: now,
        };
        self.insert_event(event.clone()).await;
        Ok(event)
    }

    async fn update_event(&self, event_id: &str, update: UpdateEventRequest) -> Result<Event> {
        self.check_writable(&format!("events/{}", event_id))?;
        let event = {
            let mut state = self.state.write().await;
            let event = state
                .events
                .get_mut(event_id)
                .ok_or_else(|| PadelTowerError::EventNotFound { event_id: event_id.to_string() })?;
            update.apply_to(event);
            event.updated_at = Utc::now();
            event.clone()
        };
        self.notify(StoreChange::Event(event_id.to_string()));
        Ok(event)
    }

    async fn get_match(&self, match_id: &str) -> Result<Option<Match>> {
        Ok(self.state.read().await.matches.iter().find(|m| m.id == match_id).cloned())
    }

    async fn get_matches(&self, event_id: &str) -> Result<Vec<Match>> {
        let state = self.state.read().await;
        Ok(Self::sorted_matches(&state, event_id))
    }

    async fn create_matches(&self, matches: Vec<NewMatch>) -> Result<Vec<Match>> {
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        self.check_writable("matches")?;
        let now = Utc::now();
        let created: Vec<Match> = matches
            .into_iter()
            .map(|m| m.into_match(generate_uuid(), now))
            .collect();
        let mut touched: Vec<String> = created.iter().map(|m| m.event_id.clone()).collect();
        touched.dedup();
        self.state.write().await.matches.extend(created.iter().cloned());
        for event_id in touched {
            self.notify(StoreChange::Matches(event_id));
        }
        debug!(count = created.len(), "Matches created in memory store");
        Ok(created)
    }

    async fn update_match(&self, match_id: &str, update: UpdateMatchRequest) -> Result<Match> {
        self.check_writable(&format!("matches/{}", match_id))?;
        let updated = {
            let mut state = self.state.write().await;
            let record = state
                .matches
                .iter_mut()
                .find(|m| m.id == match_id)
                .ok_or_else(|| PadelTowerError::MatchNotFound { match_id: match_id.to_string() })?;
            update.apply_to(record);
            record.clone()
        };
        self.notify(StoreChange::Matches(updated.event_id.clone()));
        Ok(updated)
    }

    async fn delete_round(&self, event_id: &str, round: u32) -> Result<u64> {
        self.remove_matches(event_id, |m| m.round == round).await
    }

    async fn delete_rounds_after(&self, event_id: &str, round: u32) -> Result<u64> {
        self.remove_matches(event_id, |m| m.round > round).await
    }

    async fn delete_matches(&self, event_id: &str) -> Result<u64> {
        self.remove_matches(event_id, |_| true).await
    }

    async fn subscribe_event(&self, event_id: &str) -> Result<EventSnapshots> {
        let mut rx = self.changes.subscribe();
        let initial = self
            .get_event(event_id)
            .await?
            .ok_or_else(|| PadelTowerError::EventNotFound { event_id: event_id.to_string() })?;
        let state = self.state.clone();
        let event_id = event_id.to_string();

        let stream = async_stream::stream! {
            yield Ok(initial);
            loop {
                match rx.recv().await {
                    Ok(StoreChange::Event(changed)) if changed == event_id => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
                let snapshot = state.read().await.events.get(&event_id).cloned();
                match snapshot {
                    Some(event) => yield Ok(event),
                    None => break,
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn subscribe_matches(&self, event_id: &str) -> Result<MatchSnapshots> {
        let mut rx = self.changes.subscribe();
        let initial = self.get_matches(event_id).await?;
        let state = self.state.clone();
        let event_id = event_id.to_string();

        let stream = async_stream::stream! {
            yield Ok(initial);
            loop {
                match rx.recv().await {
                    Ok(StoreChange::Matches(changed)) if changed == event_id => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
                let snapshot = {
                    let guard = state.read().await;
                    InMemoryEventStore::sorted_matches(&guard, &event_id)
                };
                yield Ok(snapshot);
            }
        };
        Ok(Box::pin(stream))
    }
}
