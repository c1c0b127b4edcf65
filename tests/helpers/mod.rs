//! Test helpers module
//!
//! Fixtures, recording doubles and a harness wiring the coordinator over
//! the in-memory store with a manual clock.

#![allow(dead_code)]

pub mod database_helper;
pub mod telegram_mock;

pub use database_helper::*;
pub use telegram_mock::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration as StdDuration;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Mutex;
use PadelTower::config::LifecycleConfig;
use PadelTower::database::{EventStore, InMemoryEventStore};
use PadelTower::lifecycle::EventLifecycleCoordinator;
use PadelTower::models::{Event, EventKind, EventStatus, Match, MatchStatus, Participant, UpdateMatchRequest};
use PadelTower::services::{MatchGenerator, Notification, NotificationKind, NotificationSink, PozoMatchGenerator, RoundPlan};
use PadelTower::utils::clock::ManualClock;
use PadelTower::Result;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// 18:00 local (UTC+1) on the event date
pub fn event_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 17, 0, 0).unwrap()
}

pub fn player(i: usize) -> Participant {
    Participant::new(format!("p{:02}", i), format!("Player {:02}", i), event_start() - Duration::days(3))
}

pub fn players(count: usize) -> Vec<Participant> {
    (1..=count).map(player).collect()
}

/// Open tournament on 2026-10-18 at 18:00 local with `count` players
pub fn tournament(id: &str, count: usize, max_courts: u32) -> Event {
    let created = event_start() - Duration::days(7);
    Event {
        id: id.to_string(),
        kind: EventKind::Tournament,
        name: format!("Americana {}", id),
        status: EventStatus::Open,
        date: "2026-10-18".to_string(),
        time: "18:00".to_string(),
        time_end: Some("20:00".to_string()),
        players: players(count),
        waitlist: vec![],
        max_courts,
        rounds: 6,
        auto_started_at: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn training(id: &str, count: usize, max_courts: u32) -> Event {
    let mut event = tournament(id, count, max_courts);
    event.kind = EventKind::Training;
    event.name = format!("Entreno {}", id);
    event.players = event
        .players
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.with_level(1.0 + i as f64 * 0.25))
        .collect();
    event
}

/// Notification sink that keeps everything it is given
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    pub async fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().await.iter().map(|n| n.kind).collect()
    }

    pub async fn count(&self, kind: NotificationKind) -> usize {
        self.sent.lock().await.iter().filter(|n| n.kind == kind).count()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}

/// Pozo generator that counts calls and can stall to widen race windows
pub struct CountingGenerator {
    inner: PozoMatchGenerator,
    calls: AtomicUsize,
    delay: Option<StdDuration>,
}

impl CountingGenerator {
    pub fn new() -> Self {
        Self { inner: PozoMatchGenerator::new(), calls: AtomicUsize::new(0), delay: None }
    }

    pub fn slow(delay: StdDuration) -> Self {
        Self { delay: Some(delay), ..Self::new() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchGenerator for CountingGenerator {
    async fn generate(&self, event: &Event, round: u32, previous: &[Match]) -> Result<RoundPlan> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.generate(event, round, previous).await
    }
}

/// Coordinator over an in-memory store with a manual clock
pub struct Harness {
    pub store: InMemoryEventStore,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub generator: Arc<CountingGenerator>,
    pub coordinator: Arc<EventLifecycleCoordinator>,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_generator(now, CountingGenerator::new())
    }

    pub fn with_generator(now: DateTime<Utc>, generator: CountingGenerator) -> Self {
        init_tracing();
        let store = InMemoryEventStore::new();
        let clock = Arc::new(ManualClock::new(now));
        let notifier = Arc::new(RecordingNotifier::default());
        let generator = Arc::new(generator);
        let coordinator = EventLifecycleCoordinator::new(
            Arc::new(store.clone()),
            generator.clone(),
            notifier.clone(),
            clock.clone(),
            &LifecycleConfig::default(),
        )
        .expect("coordinator");

        Self { store, clock, notifier, generator, coordinator: Arc::new(coordinator) }
    }

    pub async fn event(&self, id: &str) -> Event {
        self.store.get_event(id).await.unwrap().expect("event exists")
    }

    pub async fn matches(&self, id: &str) -> Vec<Match> {
        self.store.get_matches(id).await.unwrap()
    }

    /// Finish every match of `round` with a 6-3 win for side A
    pub async fn finish_round(&self, event_id: &str, round: u32) {
        for m in self.matches(event_id).await.into_iter().filter(|m| m.round == round) {
            let update = UpdateMatchRequest {
                score_a: Some(6),
                score_b: Some(3),
                status: Some(MatchStatus::Finished),
                ..Default::default()
            };
            self.store.update_match(&m.id, update).await.unwrap();
        }
    }
}
