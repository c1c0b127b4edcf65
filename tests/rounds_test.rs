//! Round generation, completion prompts and match unlocking

mod helpers;

use std::sync::Arc;
use std::time::Duration as StdDuration;
use assert_matches::assert_matches;
use chrono::Duration;
use helpers::*;
use PadelTower::config::LifecycleConfig;
use PadelTower::lifecycle::{Confirmation, EventLifecycleCoordinator, RoundGeneration, RoundPrompt};
use PadelTower::models::{Event, EventStatus, MatchStatus, TeamSide};
use PadelTower::state::{DismissalStore, MemoryDismissalStore};
use PadelTower::PadelTowerError;

async fn live_event(harness: &Harness, count: usize, courts: u32) -> Event {
    let mut event = tournament("e1", count, courts);
    event.status = EventStatus::Live;
    harness.store.insert_event(event.clone()).await;
    let generation = harness.coordinator.ensure_first_round(&event).await.unwrap();
    assert_matches!(generation, RoundGeneration::Generated { round: 1, .. });
    harness.event("e1").await
}

#[tokio::test]
async fn test_next_round_after_completion() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    live_event(&harness, 8, 2).await;
    harness.finish_round("e1", 1).await;

    let generation = harness.coordinator.generate_next_round("e1", 1).await.unwrap();
    assert_eq!(generation, RoundGeneration::Generated { round: 2, matches: 2, replaced: 0 });

    let round_two: Vec<_> = harness.matches("e1").await.into_iter().filter(|m| m.round == 2).collect();
    assert_eq!(round_two.len(), 2);
    assert!(round_two.iter().all(|m| m.status == MatchStatus::Scheduled));

    let event = harness.event("e1").await;
    assert!(event.players.iter().all(|p| p.current_court.is_some()));
}

#[tokio::test]
async fn test_incomplete_round_is_rejected() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    live_event(&harness, 8, 2).await;

    let result = harness.coordinator.generate_next_round("e1", 1).await;
    assert_matches!(result, Err(PadelTowerError::RoundIncomplete { round: 1 }));
    assert_eq!(harness.generator.calls(), 1);
}

#[tokio::test]
async fn test_round_limit() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    let mut event = tournament("e1", 4, 1);
    event.status = EventStatus::Live;
    event.rounds = 1;
    harness.store.insert_event(event.clone()).await;
    harness.coordinator.ensure_first_round(&event).await.unwrap();
    harness.finish_round("e1", 1).await;

    let result = harness.coordinator.generate_next_round("e1", 1).await;
    assert_matches!(result, Err(PadelTowerError::RoundLimitReached { round: 2, max_rounds: 1 }));

    let update = harness.coordinator.on_matches_snapshot(&event, harness.matches("e1").await).await.unwrap();
    assert_eq!(update.prompt, None);
}

#[tokio::test]
async fn test_regeneration_replaces_stale_round() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    live_event(&harness, 8, 2).await;
    harness.finish_round("e1", 1).await;

    harness.coordinator.generate_next_round("e1", 1).await.unwrap();
    let generation = harness.coordinator.generate_next_round("e1", 1).await.unwrap();

    assert_eq!(generation, RoundGeneration::Generated { round: 2, matches: 2, replaced: 2 });
    let matches = harness.matches("e1").await;
    assert_eq!(matches.iter().filter(|m| m.round == 2).count(), 2);
    assert_eq!(matches.len(), 4);
}

#[tokio::test]
async fn test_concurrent_next_round_requests_generate_once() {
    let harness = Harness::with_generator(
        event_start() + Duration::minutes(30),
        CountingGenerator::slow(StdDuration::from_millis(50)),
    );
    live_event(&harness, 8, 2).await;
    harness.finish_round("e1", 1).await;

    let (a, b) = tokio::join!(
        harness.coordinator.generate_next_round("e1", 1),
        harness.coordinator.generate_next_round("e1", 1)
    );
    let mut results = vec![a.unwrap(), b.unwrap()];
    results.sort_by_key(|r| matches!(r, RoundGeneration::AlreadyInProgress));

    assert_matches!(results[0], RoundGeneration::Generated { round: 2, .. });
    assert_eq!(results[1], RoundGeneration::AlreadyInProgress);
    assert_eq!(harness.matches("e1").await.iter().filter(|m| m.round == 2).count(), 2);
}

#[tokio::test]
async fn test_prompt_dismissal_lasts_until_round_changes() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    let event = live_event(&harness, 4, 1).await;
    harness.finish_round("e1", 1).await;

    let update = harness.coordinator.on_matches_snapshot(&event, harness.matches("e1").await).await.unwrap();
    assert_eq!(
        update.prompt,
        Some(RoundPrompt { event_id: "e1".into(), completed_round: 1, next_round: 2 })
    );

    harness.coordinator.dismiss_round_prompt("e1", 1).await.unwrap();
    let update = harness.coordinator.on_matches_snapshot(&event, harness.matches("e1").await).await.unwrap();
    assert_eq!(update.prompt, None);

    let match_id = harness.matches("e1").await[0].id.clone();
    harness.coordinator.set_score(&match_id, TeamSide::B, 4).await.unwrap();
    let update = harness.coordinator.on_matches_snapshot(&event, harness.matches("e1").await).await.unwrap();
    assert!(update.prompt.is_some());
}

#[tokio::test]
async fn test_persisted_dismissal_survives_restart() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    let event = live_event(&harness, 4, 1).await;
    harness.finish_round("e1", 1).await;
    let dismissals = Arc::new(MemoryDismissalStore::new());

    let build = || {
        EventLifecycleCoordinator::new(
            harness.coordinator.store(),
            harness.generator.clone(),
            harness.notifier.clone(),
            harness.clock.clone(),
            &LifecycleConfig::default(),
        )
        .unwrap()
        .with_dismissal_store(dismissals.clone())
    };

    build().dismiss_round_prompt("e1", 1).await.unwrap();
    assert_eq!(dismissals.load("e1").await.unwrap().map(|d| d.round), Some(1));

    let restarted = build();
    let update = restarted.on_matches_snapshot(&event, harness.matches("e1").await).await.unwrap();
    assert_eq!(update.prompt, None);

    restarted.generate_next_round("e1", 1).await.unwrap();
    assert_eq!(dismissals.load("e1").await.unwrap(), None);
}

#[tokio::test]
async fn test_unlock_requires_confirmation() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    live_event(&harness, 4, 1).await;
    harness.finish_round("e1", 1).await;
    let match_id = harness.matches("e1").await[0].id.clone();

    let result = harness.coordinator.unlock_match(&match_id, None).await;
    assert_matches!(result, Err(PadelTowerError::ConfirmationRequired(_)));

    let unlocked = harness.coordinator.unlock_match(&match_id, Some(Confirmation::Unlock)).await.unwrap();
    assert_eq!(unlocked.status, MatchStatus::Live);

    let again = harness.coordinator.unlock_match(&match_id, Some(Confirmation::Unlock)).await.unwrap();
    assert_eq!(again, unlocked);
}

#[tokio::test]
async fn test_unlocking_earlier_round_purges_later_rounds() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    live_event(&harness, 8, 2).await;
    harness.finish_round("e1", 1).await;
    harness.coordinator.generate_next_round("e1", 1).await.unwrap();
    let round_one = harness.matches("e1").await.into_iter().find(|m| m.round == 1).unwrap();

    let result = harness.coordinator.unlock_match(&round_one.id, Some(Confirmation::Unlock)).await;
    assert_matches!(result, Err(PadelTowerError::ConfirmationRequired(_)));
    assert_eq!(harness.matches("e1").await.len(), 4);

    let unlocked = harness
        .coordinator
        .unlock_match(&round_one.id, Some(Confirmation::PurgeLaterRounds))
        .await
        .unwrap();

    assert_eq!(unlocked.status, MatchStatus::Live);
    let matches = harness.matches("e1").await;
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|m| m.round == 1));
}

#[tokio::test]
async fn test_score_adjustment_clamps_at_zero() {
    let harness = Harness::new(event_start() + Duration::minutes(30));
    live_event(&harness, 4, 1).await;
    let match_id = harness.matches("e1").await[0].id.clone();

    harness.coordinator.adjust_score(&match_id, TeamSide::A, 2).await.unwrap();
    let updated = harness.coordinator.adjust_score(&match_id, TeamSide::A, -5).await.unwrap();
    assert_eq!(updated.score_a, 0);

    let finished = harness.coordinator.finish_match(&match_id).await.unwrap();
    assert_eq!(finished.status, MatchStatus::Finished);
}
