//! Event lifecycle coordinator
//!
//! Owns the status state machine of every event and the progression of its
//! rounds. Time-driven work enters through [`EventLifecycleCoordinator::tick`];
//! live views feed store snapshots through `on_event_snapshot` and
//! `on_matches_snapshot`; operators act through the command methods.
//!
//! Generation is idempotent: round existence is checked in the store and an
//! in-flight guard keyed by `(event_id, round)` turns concurrent requests
//! into no-ops. Regenerating a round deletes the stale copy first.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex as SyncMutex};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::config::LifecycleConfig;
use crate::database::EventStore;
use crate::models::{is_vacancy_id, Event, EventKind, EventStatus, Match, MatchStatus, Participant, TeamSide, UpdateEventRequest, UpdateMatchRequest};
use crate::services::matchmaking::MatchGenerator;
use crate::services::notification::{Notification, NotificationKind, NotificationSink};
use crate::services::participant::{Enrollment, ParticipantService, Withdrawal};
use crate::state::DismissalStore;
use crate::utils::clock::Clock;
use crate::utils::errors::{PadelTowerError, Result};
use crate::utils::helpers::format_local_time;
use crate::utils::logging::{log_operator_action, log_round_generation, log_store_error, log_transition};
use super::dedup::dedup_matches;
use super::rounds::{completed_round, latest_round, round_fingerprint, PromptDismissal, RoundPrompt, RoundPromptTracker};
use super::schedule::{EventWindow, ScheduleParser};
use super::transitions::{decide, Decision, Transition};

/// Outcome of a round generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RoundGeneration {
    Generated { round: u32, matches: usize, replaced: u64 },
    AlreadyExists,
    AlreadyInProgress,
}

/// What one tick did to one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TickOutcome {
    Transitioned { transition: Transition, first_round: Option<RoundGeneration> },
    AwaitingPlayers { enrolled: usize, required: usize },
    /// Another evaluation of the same event is still running
    InProgress,
    Idle,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub evaluated: usize,
    pub outcomes: Vec<(String, TickOutcome)>,
    pub failures: Vec<(String, String)>,
}

impl TickReport {
    pub fn transitions(&self) -> Vec<(&str, Transition)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                TickOutcome::Transitioned { transition, .. } => Some((id.as_str(), *transition)),
                _ => None,
            })
            .collect()
    }

    pub fn outcome(&self, event_id: &str) -> Option<&TickOutcome> {
        self.outcomes.iter().find(|(id, _)| id == event_id).map(|(_, o)| o)
    }
}

/// Operator acknowledgement required for destructive match edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Unlock,
    /// Unlock a match of an earlier round and delete every later round
    PurgeLaterRounds,
}

/// Deduplicated match set plus whatever the coordinator derived from it
#[derive(Debug, Clone, PartialEq)]
pub struct MatchesUpdate {
    pub matches: Vec<Match>,
    pub prompt: Option<RoundPrompt>,
    pub first_round: Option<RoundGeneration>,
}

#[derive(Debug, Clone, Copy)]
struct ObservedStatus {
    status: EventStatus,
    /// Went live again through `adjusting`; never auto-generates round 1
    resumed: bool,
}

/// Removes its key from the shared set on drop
struct FlightGuard<'a, K: std::hash::Hash + Eq> {
    set: &'a SyncMutex<HashSet<K>>,
    key: Option<K>,
}

impl<'a, K: std::hash::Hash + Eq + Clone> FlightGuard<'a, K> {
    fn claim(set: &'a SyncMutex<HashSet<K>>, key: K) -> Option<Self> {
        let mut entries = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !entries.insert(key.clone()) {
            return None;
        }
        Some(Self { set, key: Some(key) })
    }
}

impl<K: std::hash::Hash + Eq> Drop for FlightGuard<'_, K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut entries = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            entries.remove(&key);
        }
    }
}

pub struct EventLifecycleCoordinator {
    store: Arc<dyn EventStore>,
    generator: Arc<dyn MatchGenerator>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    schedule: ScheduleParser,
    participants: ParticipantService,
    pairing_lead: Duration,
    auto_transitions: bool,
    dismissals: Option<Arc<dyn DismissalStore>>,
    generating: SyncMutex<HashSet<(String, u32)>>,
    evaluating: SyncMutex<HashSet<String>>,
    observed: Mutex<HashMap<String, ObservedStatus>>,
    prompts: Mutex<RoundPromptTracker>,
    loaded_dismissals: Mutex<HashSet<String>>,
}

impl EventLifecycleCoordinator {
    pub fn new(
        store: Arc<dyn EventStore>,
        generator: Arc<dyn MatchGenerator>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: &LifecycleConfig,
    ) -> Result<Self> {
        Ok(Self {
            participants: ParticipantService::new(store.clone()),
            store,
            generator,
            notifier,
            clock,
            schedule: ScheduleParser::from_config(config)?,
            pairing_lead: config.pairing_lead(),
            auto_transitions: true,
            dismissals: None,
            generating: SyncMutex::new(HashSet::new()),
            evaluating: SyncMutex::new(HashSet::new()),
            observed: Mutex::new(HashMap::new()),
            prompts: Mutex::new(RoundPromptTracker::new()),
            loaded_dismissals: Mutex::new(HashSet::new()),
        })
    }

    /// Persist prompt dismissals through `store`
    pub fn with_dismissal_store(mut self, store: Arc<dyn DismissalStore>) -> Self {
        self.dismissals = Some(store);
        self
    }

    /// Disable time-driven transitions; commands and sessions keep working
    pub fn with_auto_transitions(mut self, enabled: bool) -> Self {
        self.auto_transitions = enabled;
        self
    }

    pub fn store(&self) -> Arc<dyn EventStore> {
        self.store.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn load_event(&self, event_id: &str) -> Result<Event> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| PadelTowerError::EventNotFound { event_id: event_id.to_string() })
    }

    async fn load_match(&self, match_id: &str) -> Result<Match> {
        self.store
            .get_match(match_id)
            .await?
            .ok_or_else(|| PadelTowerError::MatchNotFound { match_id: match_id.to_string() })
    }

    async fn announce(&self, notification: Notification) {
        let kind = notification.kind;
        let event_id = notification.event_id.clone();
        if let Err(e) = self.notifier.notify(notification).await {
            warn!(kind = %kind, event_id = %event_id, error = %e, "Notification delivery failed");
        }
    }

    /// Evaluate every non-terminal event once. Per-event failures are logged
    /// and reported; they are retried on the next tick.
    pub async fn tick(&self) -> Result<TickReport> {
        let events = self.store.list_active_events().await?;
        let mut report = TickReport { evaluated: events.len(), ..Default::default() };

        for event in events {
            match self.evaluate_event(&event).await {
                Ok(outcome) => report.outcomes.push((event.id.clone(), outcome)),
                Err(e) => {
                    log_store_error("evaluate_event", &event.id, &e);
                    report.failures.push((event.id.clone(), e.to_string()));
                }
            }
        }

        debug!(
            evaluated = report.evaluated,
            transitions = report.transitions().len(),
            failures = report.failures.len(),
            "Lifecycle tick completed"
        );
        Ok(report)
    }

    /// Apply the automatic transition due for one event, if any
    pub async fn evaluate_event(&self, event: &Event) -> Result<TickOutcome> {
        if event.status.is_terminal() || !self.auto_transitions {
            return Ok(TickOutcome::Idle);
        }

        let Some(_guard) = FlightGuard::claim(&self.evaluating, event.id.clone()) else {
            return Ok(TickOutcome::InProgress);
        };

        // Re-read so a tick that waited on another evaluation sees its result
        let event = self.load_event(&event.id).await?;
        if event.status.is_terminal() {
            return Ok(TickOutcome::Idle);
        }

        for player in event.players.iter().filter(|p| p.id.is_empty()) {
            warn!(event_id = %event.id, name = %player.name, "Participant without id, identity falls back to name");
        }

        let window = self.schedule.window(&event)?;
        match decide(&event, &window, self.clock.now(), self.pairing_lead) {
            Decision::Advance(transition) => self.apply_transition(&event, &window, transition).await,
            Decision::AwaitingPlayers { enrolled, required } => {
                info!(
                    event_id = %event.id,
                    status = %event.status,
                    enrolled = enrolled,
                    required = required,
                    "Waiting for players"
                );
                Ok(TickOutcome::AwaitingPlayers { enrolled, required })
            }
            Decision::Idle => Ok(TickOutcome::Idle),
        }
    }

    async fn apply_transition(&self, event: &Event, window: &EventWindow, transition: Transition) -> Result<TickOutcome> {
        // Matches first: a failed generation leaves the status untouched and
        // the next tick tries again
        let first_round = match transition.to {
            EventStatus::Pairing | EventStatus::Live => Some(self.ensure_first_round(event).await?),
            _ => None,
        };

        let mut update = UpdateEventRequest::status(transition.to);
        if transition.from == EventStatus::Open {
            update.auto_started_at = Some(self.clock.now());
        }
        let updated = self.store.update_event(&event.id, update).await?;
        self.record_status(&updated.id, transition.to, false).await;
        log_transition(&event.id, transition.from, transition.to, true);

        match transition.to {
            EventStatus::Pairing => {
                let start = format_local_time(window.start, self.schedule.offset());
                self.announce(Notification::for_event(NotificationKind::EventPairing, &updated).with_param("start", start))
                    .await;
            }
            EventStatus::Live => {
                self.announce(Notification::for_event(NotificationKind::EventLive, &updated)).await;
            }
            EventStatus::Finished => {
                self.announce(Notification::for_event(NotificationKind::EventFinished, &updated)).await;
                if updated.kind == EventKind::Training {
                    let recipients = updated.players.iter().filter(|p| !p.is_vacancy()).map(|p| p.identity().to_string()).collect();
                    self.announce(
                        Notification::for_event(NotificationKind::PostEventAnalysis, &updated).with_recipients(recipients),
                    )
                    .await;
                }
            }
            _ => {}
        }

        Ok(TickOutcome::Transitioned { transition, first_round })
    }

    async fn record_status(&self, event_id: &str, status: EventStatus, resumed: bool) {
        self.observed
            .lock()
            .await
            .insert(event_id.to_string(), ObservedStatus { status, resumed });
    }

    /// Make sure round 1 exists. Never regenerates an existing round.
    pub async fn ensure_first_round(&self, event: &Event) -> Result<RoundGeneration> {
        let Some(_guard) = FlightGuard::claim(&self.generating, (event.id.clone(), 1)) else {
            debug!(event_id = %event.id, "Round 1 generation already in progress");
            return Ok(RoundGeneration::AlreadyInProgress);
        };

        let existing = self.store.get_matches(&event.id).await?;
        if existing.iter().any(|m| m.round == 1) {
            return Ok(RoundGeneration::AlreadyExists);
        }

        self.generate_round(event, 1, &[], 0).await
    }

    /// Generate the round after `completed_round`, replacing any stale copy
    pub async fn generate_next_round(&self, event_id: &str, completed_round: u32) -> Result<RoundGeneration> {
        let event = self.load_event(event_id).await?;
        let target = completed_round + 1;

        if event.status.is_terminal() {
            return Err(PadelTowerError::InvalidStateTransition {
                from: event.status.to_string(),
                to: format!("round {}", target),
            });
        }
        if target > event.rounds {
            return Err(PadelTowerError::RoundLimitReached { round: target, max_rounds: event.rounds });
        }

        let matches = dedup_matches(self.store.get_matches(event_id).await?);
        let previous: Vec<Match> = matches.into_iter().filter(|m| m.round == completed_round).collect();
        if previous.is_empty() || previous.iter().any(|m| !m.is_finished()) {
            return Err(PadelTowerError::RoundIncomplete { round: completed_round });
        }

        let Some(_guard) = FlightGuard::claim(&self.generating, (event.id.clone(), target)) else {
            debug!(event_id = %event.id, round = target, "Round generation already in progress");
            return Ok(RoundGeneration::AlreadyInProgress);
        };

        let replaced = self.store.delete_round(event_id, target).await?;
        if replaced > 0 {
            warn!(event_id = event_id, round = target, replaced = replaced, "Stale round deleted before regeneration");
        }

        let generation = self.generate_round(&event, target, &previous, replaced).await?;
        self.forget_dismissal(event_id).await;
        Ok(generation)
    }

    async fn generate_round(&self, event: &Event, round: u32, previous: &[Match], replaced: u64) -> Result<RoundGeneration> {
        let plan = self.generator.generate(event, round, previous).await?;
        let mut created = self.store.create_matches(plan.matches).await?;

        // Enrollments and withdrawals may have landed while the generator ran
        let current = self.load_event(&event.id).await?;
        let mut players = merge_players(&current.players, &plan.players);
        for index in fill_departures(&mut players, &mut created, self.clock.now()) {
            let m = &created[index];
            warn!(event_id = %event.id, match_id = %m.id, round = round, "Participant left during generation, slot reassigned");
            self.store.update_match(&m.id, UpdateMatchRequest::teams_of(m)).await?;
        }
        if players != current.players {
            self.store
                .update_event(&event.id, UpdateEventRequest { players: Some(players), ..Default::default() })
                .await?;
        }

        log_round_generation(&event.id, round, created.len(), replaced);
        self.announce(
            Notification::for_event(NotificationKind::RoundGenerated, &current)
                .with_param("round", round)
                .with_param("matches", created.len()),
        )
        .await;

        Ok(RoundGeneration::Generated { round, matches: created.len(), replaced })
    }

    /// Track a status seen on a live subscription. A fresh `live` (not seen
    /// before, and not coming back from `adjusting`) ensures round 1.
    pub async fn on_event_snapshot(&self, event: &Event) -> Result<Option<RoundGeneration>> {
        let previous = {
            let mut observed = self.observed.lock().await;
            let previous = observed.get(&event.id).copied();
            let resumed = match (previous, event.status) {
                (Some(p), EventStatus::Live) if p.status == EventStatus::Adjusting => true,
                (Some(p), EventStatus::Live) if p.status == EventStatus::Live => p.resumed,
                _ => false,
            };
            observed.insert(event.id.clone(), ObservedStatus { status: event.status, resumed });
            previous
        };

        let fresh_live = event.status == EventStatus::Live
            && !matches!(previous.map(|p| p.status), Some(EventStatus::Live) | Some(EventStatus::Adjusting));
        if !fresh_live {
            return Ok(None);
        }

        info!(event_id = %event.id, "Event went live, ensuring round 1");
        Ok(Some(self.ensure_first_round(event).await?))
    }

    /// Deduplicate a match snapshot, run the round 1 safety net and check
    /// whether the latest round is complete
    pub async fn on_matches_snapshot(&self, event: &Event, matches: Vec<Match>) -> Result<MatchesUpdate> {
        let matches = dedup_matches(matches);

        let mut first_round = None;
        if matches.is_empty() && self.needs_first_round(event).await {
            first_round = Some(self.ensure_first_round(event).await?);
        }

        let prompt = self.check_round_completion(event, &matches).await;
        Ok(MatchesUpdate { matches, prompt, first_round })
    }

    async fn needs_first_round(&self, event: &Event) -> bool {
        match event.status {
            EventStatus::Live => {
                let observed = self.observed.lock().await;
                !observed.get(&event.id).map(|o| o.resumed).unwrap_or(false)
            }
            EventStatus::Open => event.is_full(),
            _ => false,
        }
    }

    /// Prompt for the next round when the latest one is complete and the
    /// prompt was not dismissed for this exact round state
    pub async fn check_round_completion(&self, event: &Event, matches: &[Match]) -> Option<RoundPrompt> {
        let round = completed_round(matches, event.rounds)?;
        let fingerprint = round_fingerprint(matches, round);
        self.restore_dismissal(&event.id).await;

        let show = self.prompts.lock().await.should_prompt(&event.id, round, fingerprint);
        if !show {
            return None;
        }

        Some(RoundPrompt {
            event_id: event.id.clone(),
            completed_round: round,
            next_round: round + 1,
        })
    }

    async fn restore_dismissal(&self, event_id: &str) {
        let Some(store) = &self.dismissals else { return };
        if !self.loaded_dismissals.lock().await.insert(event_id.to_string()) {
            return;
        }

        match store.load(event_id).await {
            Ok(Some(dismissal)) => self.prompts.lock().await.dismiss(event_id, dismissal),
            Ok(None) => {}
            Err(e) => warn!(event_id = event_id, error = %e, "Could not restore prompt dismissal"),
        }
    }

    /// Dismiss the prompt for `round` until one of its matches changes
    pub async fn dismiss_round_prompt(&self, event_id: &str, round: u32) -> Result<()> {
        let matches = dedup_matches(self.store.get_matches(event_id).await?);
        let dismissal = PromptDismissal { round, fingerprint: round_fingerprint(&matches, round) };
        self.prompts.lock().await.dismiss(event_id, dismissal);
        log_operator_action("dismiss_round_prompt", event_id, Some(&format!("round {}", round)));

        if let Some(store) = &self.dismissals {
            if let Err(e) = store.save(event_id, dismissal).await {
                warn!(event_id = event_id, error = %e, "Could not persist prompt dismissal");
            }
        }
        Ok(())
    }

    async fn forget_dismissal(&self, event_id: &str) {
        self.prompts.lock().await.clear(event_id);
        if let Some(store) = &self.dismissals {
            if let Err(e) = store.clear(event_id).await {
                warn!(event_id = event_id, error = %e, "Could not clear prompt dismissal");
            }
        }
    }

    /// Add `delta` to one side of a match, clamped at zero
    pub async fn adjust_score(&self, match_id: &str, side: TeamSide, delta: i32) -> Result<Match> {
        let current = self.load_match(match_id).await?;
        let value = current.adjusted_score(side, delta);
        self.set_score(match_id, side, value).await
    }

    /// Persist an absolute score computed by a caller's working copy
    pub async fn set_score(&self, match_id: &str, side: TeamSide, value: u32) -> Result<Match> {
        let updated = self.store.update_match(match_id, UpdateMatchRequest::score(side, value)).await?;
        debug!(match_id = match_id, side = ?side, value = value, "Score updated");
        Ok(updated)
    }

    pub async fn finish_match(&self, match_id: &str) -> Result<Match> {
        let updated = self.store.update_match(match_id, UpdateMatchRequest::status(MatchStatus::Finished)).await?;
        log_operator_action("finish_match", match_id, Some(&format!("{}-{}", updated.score_a, updated.score_b)));
        Ok(updated)
    }

    /// Reopen a finished match. A match from an earlier round than the latest
    /// needs [`Confirmation::PurgeLaterRounds`]; every later round is deleted
    /// before the match reopens.
    pub async fn unlock_match(&self, match_id: &str, confirmation: Option<Confirmation>) -> Result<Match> {
        let Some(confirmation) = confirmation else {
            return Err(PadelTowerError::ConfirmationRequired(format!("Unlock match {}", match_id)));
        };

        let current = self.load_match(match_id).await?;
        let matches = self.store.get_matches(&current.event_id).await?;
        let latest = latest_round(&matches).unwrap_or(current.round);

        if current.round < latest {
            if confirmation != Confirmation::PurgeLaterRounds {
                return Err(PadelTowerError::ConfirmationRequired(format!(
                    "Unlocking round {} deletes rounds {} to {}",
                    current.round,
                    current.round + 1,
                    latest
                )));
            }
            let purged = self.store.delete_rounds_after(&current.event_id, current.round).await?;
            log_operator_action("purge_rounds", &current.event_id, Some(&format!("after round {}: {} matches", current.round, purged)));
            self.forget_dismissal(&current.event_id).await;
        }

        if current.status == MatchStatus::Live {
            return Ok(current);
        }

        let updated = self.store.update_match(match_id, UpdateMatchRequest::status(MatchStatus::Live)).await?;
        log_operator_action("unlock_match", match_id, None);
        Ok(updated)
    }

    async fn manual_transition(&self, event_id: &str, to: EventStatus) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        if !event.status.allows_manual(to) {
            return Err(PadelTowerError::InvalidStateTransition {
                from: event.status.to_string(),
                to: to.to_string(),
            });
        }

        let updated = self.store.update_event(event_id, UpdateEventRequest::status(to)).await?;
        let resumed = event.status == EventStatus::Adjusting && to == EventStatus::Live;
        self.record_status(event_id, to, resumed).await;
        log_transition(event_id, event.status, to, false);
        Ok(updated)
    }

    pub async fn begin_adjusting(&self, event_id: &str) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        if !matches!(event.status, EventStatus::Pairing | EventStatus::Live) {
            return Err(PadelTowerError::InvalidStateTransition {
                from: event.status.to_string(),
                to: EventStatus::Adjusting.to_string(),
            });
        }
        self.manual_transition(event_id, EventStatus::Adjusting).await
    }

    /// Leave `adjusting`. Round 1 is not regenerated.
    pub async fn resume_live(&self, event_id: &str) -> Result<Event> {
        let event = self.load_event(event_id).await?;
        if event.status != EventStatus::Adjusting {
            return Err(PadelTowerError::InvalidStateTransition {
                from: event.status.to_string(),
                to: EventStatus::Live.to_string(),
            });
        }
        self.manual_transition(event_id, EventStatus::Live).await
    }

    pub async fn cancel_event(&self, event_id: &str) -> Result<Event> {
        let updated = self.manual_transition(event_id, EventStatus::Cancelled).await?;
        self.announce(Notification::for_event(NotificationKind::EventCancelled, &updated)).await;
        Ok(updated)
    }

    /// Start an open or pairing event now, full or not
    pub async fn force_start(&self, event_id: &str) -> Result<RoundGeneration> {
        let event = self.load_event(event_id).await?;
        if !matches!(event.status, EventStatus::Open | EventStatus::Pairing) {
            return Err(PadelTowerError::InvalidStateTransition {
                from: event.status.to_string(),
                to: EventStatus::Live.to_string(),
            });
        }

        let generation = self.ensure_first_round(&event).await?;
        let updated = self.manual_transition(event_id, EventStatus::Live).await?;
        log_operator_action("force_start", event_id, Some(&format!("{}/{} players", event.enrolled_count(), event.required_players())));
        self.announce(Notification::for_event(NotificationKind::EventLive, &updated)).await;
        Ok(generation)
    }

    pub async fn add_participant(&self, event_id: &str, participant: Participant) -> Result<Enrollment> {
        self.participants.add_participant(event_id, participant).await
    }

    /// Withdraw a participant, promoting from the waitlist when possible
    pub async fn remove_participant(&self, event_id: &str, participant_id: &str) -> Result<Withdrawal> {
        let withdrawal = self.participants.remove_participant(event_id, participant_id).await?;
        let event = self.load_event(event_id).await?;

        self.announce(
            Notification::for_event(NotificationKind::PlayerWithdrawn, &event)
                .with_param("player_name", &withdrawal.removed.name)
                .with_recipients(vec![withdrawal.removed.identity().to_string()]),
        )
        .await;

        if let Some(promoted) = &withdrawal.promoted {
            self.announce(
                Notification::for_event(NotificationKind::WaitlistPromoted, &event)
                    .with_param("player_name", &promoted.name)
                    .with_recipients(vec![promoted.identity().to_string()]),
            )
            .await;
        }

        Ok(withdrawal)
    }

    pub async fn promote_next(&self, event_id: &str) -> Result<Option<Participant>> {
        self.participants.promote_next(event_id).await
    }
}

/// Copy court and partner bookkeeping from a generator plan onto the roster,
/// leaving everyone the plan does not mention untouched
fn merge_players(roster: &[Participant], planned: &[Participant]) -> Vec<Participant> {
    let planned: HashMap<&str, &Participant> = planned.iter().map(|p| (p.identity(), p)).collect();
    roster
        .iter()
        .map(|p| match planned.get(p.identity()) {
            Some(plan) if !p.is_vacancy() => Participant {
                current_court: plan.current_court,
                last_partner: plan.last_partner.clone(),
                ..p.clone()
            },
            _ => p.clone(),
        })
        .collect()
}

/// Seat roster players who have no match in place of participants that are
/// no longer on the roster. With nobody left to seat, the departed slot
/// becomes a vacancy tied to that participant. Returns the indexes of the
/// matches that changed.
fn fill_departures(players: &mut Vec<Participant>, matches: &mut [Match], now: DateTime<Utc>) -> Vec<usize> {
    let seated: HashSet<String> = matches
        .iter()
        .flat_map(|m| m.team_a_ids.iter().chain(m.team_b_ids.iter()).cloned())
        .collect();
    let mut bench: VecDeque<usize> = players
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_vacancy() && !seated.contains(p.identity()))
        .map(|(index, _)| index)
        .collect();

    let mut changed = Vec::new();
    for (index, m) in matches.iter_mut().enumerate() {
        let departed: Vec<(String, String)> = m
            .team_a_ids
            .iter()
            .zip(m.team_a_names.iter())
            .chain(m.team_b_ids.iter().zip(m.team_b_names.iter()))
            .filter(|(id, _)| !is_vacancy_id(id) && !players.iter().any(|p| p.matches_identity(id)))
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect();

        for (id, name) in &departed {
            let replacement = match bench.pop_front() {
                Some(slot) => {
                    players[slot].current_court = Some(m.court);
                    players[slot].clone()
                }
                None => {
                    let mut vacancy = Participant::vacancy_for(&Participant::new(id.as_str(), name.as_str(), now));
                    vacancy.current_court = Some(m.court);
                    players.push(vacancy.clone());
                    vacancy
                }
            };
            m.substitute(id, replacement.identity(), &replacement.name);
        }
        if !departed.is_empty() {
            changed.push(index);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMatch;

    fn round_one_match(court: u32, ids: [&str; 4]) -> Match {
        NewMatch {
            event_id: "e1".into(),
            round: 1,
            court,
            team_a_ids: vec![ids[0].into(), ids[1].into()],
            team_b_ids: vec![ids[2].into(), ids[3].into()],
            team_a_names: ids[..2].iter().map(|id| id.to_uppercase()).collect(),
            team_b_names: ids[2..].iter().map(|id| id.to_uppercase()).collect(),
        }
        .into_match(format!("m{}", court), Utc::now())
    }

    #[test]
    fn test_fill_departures_seats_benched_player_then_vacancy() {
        let now = Utc::now();
        let mut players: Vec<Participant> = ["p1", "p3", "p4", "w1", "p5", "p6", "p7"]
            .iter()
            .map(|id| Participant::new(*id, id.to_uppercase(), now))
            .collect();
        let mut matches = vec![
            round_one_match(1, ["p1", "p2", "p3", "p4"]),
            round_one_match(2, ["p5", "p6", "p7", "p8"]),
        ];

        let changed = fill_departures(&mut players, &mut matches, now);

        assert_eq!(changed, vec![0, 1]);
        assert!(matches[0].involves("w1"));
        assert!(!matches[0].involves("p2"));
        assert_eq!(players[3].current_court, Some(1));
        assert!(matches[1].involves("vacante_id:p8"));
        assert_eq!(players.last().map(|p| p.id.as_str()), Some("vacante_id:p8"));
        assert_eq!(players.last().and_then(|p| p.current_court), Some(2));
    }

    #[test]
    fn test_fill_departures_leaves_settled_round_alone() {
        let now = Utc::now();
        let mut players: Vec<Participant> = ["p1", "p2", "p3", "p4"]
            .iter()
            .map(|id| Participant::new(*id, id.to_uppercase(), now))
            .collect();
        let mut matches = vec![round_one_match(1, ["p1", "p2", "p3", "p4"])];

        assert!(fill_departures(&mut players, &mut matches, now).is_empty());
        assert_eq!(players.len(), 4);
    }

    #[test]
    fn test_merge_players_keeps_roster_order_and_vacancies() {
        let now = Utc::now();
        let roster = vec![
            Participant::new("p1", "Ana", now),
            Participant::vacancy(now),
            Participant::new("p2", "Bea", now),
        ];
        let mut planned_bea = Participant::new("p2", "Bea", now);
        planned_bea.current_court = Some(2);
        planned_bea.last_partner = Some("p1".into());

        let merged = merge_players(&roster, &[planned_bea]);
        assert_eq!(merged.len(), 3);
        assert!(merged[1].is_vacancy());
        assert_eq!(merged[2].current_court, Some(2));
        assert_eq!(merged[2].last_partner.as_deref(), Some("p1"));
        assert_eq!(merged[0].current_court, None);
    }

    #[test]
    fn test_flight_guard_releases_on_drop() {
        let set = SyncMutex::new(HashSet::new());
        let guard = FlightGuard::claim(&set, ("e1".to_string(), 1));
        assert!(guard.is_some());
        assert!(FlightGuard::claim(&set, ("e1".to_string(), 1)).is_none());
        assert!(FlightGuard::claim(&set, ("e1".to_string(), 2)).is_some());
        drop(guard);
        assert!(FlightGuard::claim(&set, ("e1".to_string(), 1)).is_some());
    }
}
