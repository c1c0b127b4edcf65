//! Automatic status transitions driven by the lifecycle tick

mod helpers;

use std::time::Duration as StdDuration;
use assert_matches::assert_matches;
use chrono::Duration;
use helpers::*;
use PadelTower::lifecycle::{RoundGeneration, TickOutcome, Transition};
use PadelTower::models::{EventStatus, MatchStatus};
use PadelTower::services::NotificationKind;

#[tokio::test]
async fn test_full_event_goes_live_once_under_concurrent_ticks() {
    let harness = Harness::with_generator(
        event_start() + Duration::minutes(1),
        CountingGenerator::slow(StdDuration::from_millis(50)),
    );
    harness.store.insert_event(tournament("e1", 16, 4)).await;

    let (first, second) = tokio::join!(harness.coordinator.tick(), harness.coordinator.tick());
    let (first, second) = (first.unwrap(), second.unwrap());

    let outcomes = [first.outcome("e1").cloned(), second.outcome("e1").cloned()];
    let transitioned = outcomes
        .iter()
        .filter(|o| matches!(o, Some(TickOutcome::Transitioned { .. })))
        .count();
    assert_eq!(transitioned, 1);

    let event = harness.event("e1").await;
    assert_eq!(event.status, EventStatus::Live);
    assert!(event.auto_started_at.is_some());

    let matches = harness.matches("e1").await;
    assert_eq!(matches.len(), 4);
    assert!(matches.iter().all(|m| m.round == 1 && m.status == MatchStatus::Scheduled));
    assert_eq!(harness.generator.calls(), 1);
    assert_eq!(harness.notifier.count(NotificationKind::EventLive).await, 1);
    assert_eq!(harness.notifier.count(NotificationKind::RoundGenerated).await, 1);
}

#[tokio::test]
async fn test_short_roster_stays_open() {
    let harness = Harness::new(event_start() + Duration::minutes(5));
    harness.store.insert_event(tournament("e1", 15, 4)).await;

    let report = harness.coordinator.tick().await.unwrap();

    assert_eq!(
        report.outcome("e1"),
        Some(&TickOutcome::AwaitingPlayers { enrolled: 15, required: 16 })
    );
    assert_eq!(harness.event("e1").await.status, EventStatus::Open);
    assert!(harness.matches("e1").await.is_empty());
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn test_pairing_then_live_generates_round_one_once() {
    let harness = Harness::new(event_start() - Duration::hours(2));
    harness.store.insert_event(tournament("e1", 8, 2)).await;

    let report = harness.coordinator.tick().await.unwrap();
    assert_matches!(
        report.outcome("e1"),
        Some(TickOutcome::Transitioned {
            transition: Transition { from: EventStatus::Open, to: EventStatus::Pairing },
            first_round: Some(RoundGeneration::Generated { round: 1, matches: 2, replaced: 0 }),
        })
    );
    assert_eq!(harness.event("e1").await.status, EventStatus::Pairing);
    let pairing = harness.notifier.sent().await.into_iter().find(|n| n.kind == NotificationKind::EventPairing).unwrap();
    assert_eq!(pairing.parameters.get("start").map(String::as_str), Some("18/10/2026 18:00"));

    harness.clock.set(event_start());
    let report = harness.coordinator.tick().await.unwrap();
    assert_matches!(
        report.outcome("e1"),
        Some(TickOutcome::Transitioned {
            transition: Transition { from: EventStatus::Pairing, to: EventStatus::Live },
            first_round: Some(RoundGeneration::AlreadyExists),
        })
    );

    assert_eq!(harness.matches("e1").await.len(), 2);
    assert_eq!(harness.generator.calls(), 1);
    assert_eq!(
        harness.notifier.kinds().await,
        vec![NotificationKind::RoundGenerated, NotificationKind::EventPairing, NotificationKind::EventLive]
    );
}

#[tokio::test]
async fn test_outside_pairing_lead_nothing_happens() {
    let harness = Harness::new(event_start() - Duration::hours(3) - Duration::minutes(1));
    harness.store.insert_event(tournament("e1", 8, 2)).await;

    let report = harness.coordinator.tick().await.unwrap();
    assert_eq!(report.outcome("e1"), Some(&TickOutcome::Idle));
    assert_eq!(harness.event("e1").await.status, EventStatus::Open);
}

#[tokio::test]
async fn test_adjusting_event_is_left_alone() {
    let harness = Harness::new(event_start() + Duration::hours(5));
    let mut event = tournament("e1", 8, 2);
    event.status = EventStatus::Adjusting;
    harness.store.insert_event(event).await;

    let report = harness.coordinator.tick().await.unwrap();
    assert_eq!(report.outcome("e1"), Some(&TickOutcome::Idle));
    assert_eq!(harness.event("e1").await.status, EventStatus::Adjusting);
    assert!(harness.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_terminal_events_are_not_evaluated() {
    let harness = Harness::new(event_start() + Duration::minutes(1));
    for (id, status) in [("done", EventStatus::Finished), ("off", EventStatus::Cancelled)] {
        let mut event = tournament(id, 8, 2);
        event.status = status;
        harness.store.insert_event(event).await;
    }

    let report = harness.coordinator.tick().await.unwrap();
    assert_eq!(report.evaluated, 0);
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn test_day_month_year_date_with_time_range() {
    let harness = Harness::new(event_start() + Duration::minutes(1));
    let mut event = tournament("e1", 4, 1);
    event.date = "18/10/2026".to_string();
    event.time = "18:00 - 19:30".to_string();
    event.time_end = None;
    harness.store.insert_event(event).await;

    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.event("e1").await.status, EventStatus::Live);

    harness.clock.set(event_start() + Duration::minutes(89));
    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.event("e1").await.status, EventStatus::Live);

    harness.clock.set(event_start() + Duration::minutes(90));
    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.event("e1").await.status, EventStatus::Finished);
}

#[tokio::test]
async fn test_end_past_midnight_rolls_to_next_day() {
    let harness = Harness::new(event_start() + Duration::minutes(1));
    let mut event = tournament("e1", 4, 1);
    event.time = "23:00".to_string();
    event.time_end = Some("01:00".to_string());
    harness.store.insert_event(event).await;

    // 23:00 local is 22:00 UTC
    let start = event_start() + Duration::hours(5);
    harness.clock.set(start + Duration::minutes(5));
    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.event("e1").await.status, EventStatus::Live);

    harness.clock.set(start + Duration::minutes(90));
    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.event("e1").await.status, EventStatus::Live);

    harness.clock.set(start + Duration::hours(2));
    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.event("e1").await.status, EventStatus::Finished);
}

#[tokio::test]
async fn test_training_finish_requests_post_event_analysis() {
    let harness = Harness::new(event_start() + Duration::hours(2));
    let mut event = training("t1", 4, 1);
    event.status = EventStatus::Live;
    harness.store.insert_event(event).await;

    let report = harness.coordinator.tick().await.unwrap();
    assert_eq!(report.transitions(), vec![("t1", Transition { from: EventStatus::Live, to: EventStatus::Finished })]);

    let sent = harness.notifier.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].kind, NotificationKind::EventFinished);
    assert_eq!(sent[1].kind, NotificationKind::PostEventAnalysis);
    assert_eq!(sent[1].recipients, vec!["p01", "p02", "p03", "p04"]);
}

#[tokio::test]
async fn test_tournament_finish_has_no_analysis() {
    let harness = Harness::new(event_start() + Duration::hours(3));
    let mut event = tournament("e1", 4, 1);
    event.status = EventStatus::Live;
    harness.store.insert_event(event).await;

    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.notifier.kinds().await, vec![NotificationKind::EventFinished]);
}

#[tokio::test]
async fn test_bad_schedule_fails_alone() {
    let harness = Harness::new(event_start() + Duration::minutes(1));
    let mut broken = tournament("broken", 4, 1);
    broken.date = "mañana".to_string();
    harness.store.insert_event(broken).await;
    harness.store.insert_event(tournament("ok", 4, 1)).await;

    let report = harness.coordinator.tick().await.unwrap();

    assert_eq!(report.evaluated, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "broken");
    assert_eq!(harness.event("ok").await.status, EventStatus::Live);
}

#[tokio::test]
async fn test_failed_generation_leaves_status_for_retry() {
    let harness = Harness::new(event_start() + Duration::minutes(1));
    harness.store.insert_event(tournament("e1", 4, 1)).await;

    harness.store.set_fail_writes(true);
    let report = harness.coordinator.tick().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    harness.store.set_fail_writes(false);
    assert_eq!(harness.event("e1").await.status, EventStatus::Open);

    harness.coordinator.tick().await.unwrap();
    assert_eq!(harness.event("e1").await.status, EventStatus::Live);
    assert_eq!(harness.matches("e1").await.len(), 1);
}

#[tokio::test]
async fn test_disabled_auto_transitions() {
    let harness = Harness::new(event_start() + Duration::minutes(1));
    harness.store.insert_event(tournament("e1", 4, 1)).await;
    let event = harness.event("e1").await;

    let coordinator = PadelTower::lifecycle::EventLifecycleCoordinator::new(
        harness.coordinator.store(),
        harness.generator.clone(),
        harness.notifier.clone(),
        harness.clock.clone(),
        &PadelTower::config::LifecycleConfig::default(),
    )
    .unwrap()
    .with_auto_transitions(false);

    assert_eq!(coordinator.evaluate_event(&event).await.unwrap(), TickOutcome::Idle);
    assert_eq!(harness.event("e1").await.status, EventStatus::Open);
}
