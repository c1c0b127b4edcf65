//! Live view of one event
//!
//! A session follows the event record and its matches through the store
//! subscriptions, keeps a deduplicated working copy in a watch channel and
//! routes operator commands through the coordinator. Score edits are applied
//! to the working copy first and reconciled with the store on failure.

use std::sync::Arc;
use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::models::{Event, Match, TeamSide};
use crate::utils::errors::{PadelTowerError, Result};
use super::coordinator::{Confirmation, EventLifecycleCoordinator, RoundGeneration};
use super::dedup::dedup_matches;
use super::rounds::RoundPrompt;

/// What a live screen renders
#[derive(Debug, Clone)]
pub struct SessionView {
    pub event: Event,
    pub matches: Vec<Match>,
    pub prompt: Option<RoundPrompt>,
}

impl SessionView {
    pub fn find_match(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    pub fn round(&self, round: u32) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.round == round).collect()
    }
}

pub struct LiveEventSession {
    event_id: String,
    coordinator: Arc<EventLifecycleCoordinator>,
    view: Arc<watch::Sender<SessionView>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LiveEventSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveEventSession")
            .field("event_id", &self.event_id)
            .finish_non_exhaustive()
    }
}

impl LiveEventSession {
    /// Subscribe to `event_id` and start following it
    pub async fn open(coordinator: Arc<EventLifecycleCoordinator>, event_id: &str) -> Result<Self> {
        let store = coordinator.store();
        let mut events = store.subscribe_event(event_id).await?;
        let mut match_sets = store.subscribe_matches(event_id).await?;

        let event = match events.next().await {
            Some(event) => event?,
            None => return Err(PadelTowerError::EventNotFound { event_id: event_id.to_string() }),
        };
        coordinator.on_event_snapshot(&event).await?;

        let initial = match match_sets.next().await {
            Some(matches) => matches?,
            None => Vec::new(),
        };
        let update = coordinator.on_matches_snapshot(&event, initial).await?;

        let (view_tx, _) = watch::channel(SessionView {
            event,
            matches: update.matches,
            prompt: update.prompt,
        });
        let view = Arc::new(view_tx);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = {
            let view = view.clone();
            let coordinator = coordinator.clone();
            let event_id = event_id.to_string();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        next = events.next() => match next {
                            Some(Ok(event)) => {
                                if let Err(e) = coordinator.on_event_snapshot(&event).await {
                                    warn!(event_id = %event_id, error = %e, "Event snapshot handling failed");
                                }
                                view.send_modify(|v| v.event = event);
                            }
                            Some(Err(e)) => warn!(event_id = %event_id, error = %e, "Event subscription error"),
                            None => break,
                        },
                        next = match_sets.next() => match next {
                            Some(Ok(matches)) => {
                                let event = view.borrow().event.clone();
                                apply_matches(&coordinator, &view, &event, matches).await;
                            }
                            Some(Err(e)) => warn!(event_id = %event_id, error = %e, "Match subscription error"),
                            None => break,
                        },
                    }
                }
                debug!(event_id = %event_id, "Live session stopped");
            })
        };

        info!(event_id = event_id, "Live session opened");
        Ok(Self {
            event_id: event_id.to_string(),
            coordinator,
            view,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Add `delta` to one side of a match. The working copy changes at once;
    /// if the write fails the match is re-read and the error returned.
    pub async fn adjust_score(&self, match_id: &str, side: TeamSide, delta: i32) -> Result<u32> {
        let value = {
            let view = self.view.borrow();
            let current = view
                .find_match(match_id)
                .ok_or_else(|| PadelTowerError::MatchNotFound { match_id: match_id.to_string() })?;
            current.adjusted_score(side, delta)
        };

        self.view.send_modify(|v| {
            if let Some(m) = v.matches.iter_mut().find(|m| m.id == match_id) {
                m.set_score(side, value);
            }
        });

        match self.coordinator.set_score(match_id, side, value).await {
            Ok(_) => Ok(value),
            Err(e) => {
                warn!(match_id = match_id, error = %e, "Score write failed, reconciling with store");
                self.reconcile(match_id).await;
                Err(e)
            }
        }
    }

    async fn reconcile(&self, match_id: &str) {
        match self.coordinator.store().get_match(match_id).await {
            Ok(Some(stored)) => self.view.send_modify(|v| {
                if let Some(m) = v.matches.iter_mut().find(|m| m.id == match_id) {
                    *m = stored;
                }
            }),
            Ok(None) => self.view.send_modify(|v| v.matches.retain(|m| m.id != match_id)),
            Err(e) => warn!(match_id = match_id, error = %e, "Could not re-read match"),
        }
    }

    pub async fn finish_match(&self, match_id: &str) -> Result<Match> {
        let finished = self.coordinator.finish_match(match_id).await?;
        self.replace_match(finished.clone());
        Ok(finished)
    }

    pub async fn unlock_match(&self, match_id: &str, confirmation: Option<Confirmation>) -> Result<Match> {
        let unlocked = self.coordinator.unlock_match(match_id, confirmation).await?;
        self.replace_match(unlocked.clone());
        Ok(unlocked)
    }

    /// Generate the round the current prompt offers
    pub async fn generate_next_round(&self) -> Result<RoundGeneration> {
        let prompt = self.view.borrow().prompt.clone();
        let Some(prompt) = prompt else {
            return Err(PadelTowerError::InvalidInput(format!(
                "No completed round awaiting generation in event {}",
                self.event_id
            )));
        };

        let generation = self.coordinator.generate_next_round(&self.event_id, prompt.completed_round).await?;
        self.view.send_modify(|v| v.prompt = None);
        Ok(generation)
    }

    pub async fn dismiss_prompt(&self) -> Result<()> {
        let prompt = self.view.borrow().prompt.clone();
        let Some(prompt) = prompt else {
            return Ok(());
        };

        self.coordinator.dismiss_round_prompt(&self.event_id, prompt.completed_round).await?;
        self.view.send_modify(|v| v.prompt = None);
        Ok(())
    }

    fn replace_match(&self, updated: Match) {
        self.view.send_modify(|v| {
            if let Some(m) = v.matches.iter_mut().find(|m| m.id == updated.id) {
                *m = updated;
            }
        });
    }

    /// Stop following the event
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!(event_id = %self.event_id, "Live session closed");
    }
}

impl Drop for LiveEventSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn apply_matches(
    coordinator: &EventLifecycleCoordinator,
    view: &watch::Sender<SessionView>,
    event: &Event,
    matches: Vec<Match>,
) {
    match coordinator.on_matches_snapshot(event, matches.clone()).await {
        Ok(update) => view.send_modify(|v| {
            v.matches = update.matches;
            v.prompt = update.prompt;
        }),
        Err(e) => {
            warn!(event_id = %event.id, error = %e, "Match snapshot handling failed");
            let matches = dedup_matches(matches);
            view.send_modify(|v| v.matches = matches);
        }
    }
}
