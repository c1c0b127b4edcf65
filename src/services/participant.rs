//! Participant service implementation
//!
//! Enrollment, waitlist and withdrawal. A withdrawal from an event with
//! pending matches leaves a vacancy sentinel in the roster and in those
//! matches; the first waitlisted player, when there is room, takes it over.
//! Each sentinel names the withdrawn participant, so whoever fills it later
//! lands in exactly the slots that participant left.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::database::EventStore;
use crate::models::{Event, Match, Participant, UpdateEventRequest, UpdateMatchRequest, VACANCY_ID};
use crate::utils::errors::{PadelTowerError, Result};
use crate::utils::helpers::normalize_whitespace;

/// Result of an enrollment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Enrollment {
    Enrolled { count: usize },
    /// Took over a vacancy sentinel, including its pending match slots
    FilledVacancy { matches_updated: usize },
    Waitlisted { position: usize },
}

/// Result of a withdrawal
#[derive(Debug, Clone, PartialEq)]
pub struct Withdrawal {
    pub removed: Participant,
    pub promoted: Option<Participant>,
    /// Pending matches whose slot now holds the promoted player or a vacancy
    pub matches_updated: usize,
}

#[derive(Clone)]
pub struct ParticipantService {
    store: Arc<dyn EventStore>,
}

impl ParticipantService {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    async fn load_event(&self, event_id: &str) -> Result<Event> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| PadelTowerError::EventNotFound { event_id: event_id.to_string() })
    }

    /// Pending matches of an event that reference `participant_id`
    async fn pending_matches_with(&self, event_id: &str, participant_id: &str) -> Result<Vec<Match>> {
        let matches = self.store.get_matches(event_id).await?;
        Ok(matches
            .into_iter()
            .filter(|m| !m.is_finished() && m.involves(participant_id))
            .collect())
    }

    /// Enroll a participant, filling the first vacancy when there is one and
    /// falling back to the waitlist when the event is full
    pub async fn add_participant(&self, event_id: &str, mut participant: Participant) -> Result<Enrollment> {
        participant.name = normalize_whitespace(&participant.name);
        if participant.identity().is_empty() || participant.is_vacancy() {
            return Err(PadelTowerError::InvalidInput("Participant needs an id or a name".to_string()));
        }

        let mut event = self.load_event(event_id).await?;
        let identity = participant.identity().to_string();

        let already_in = event.players.iter().chain(event.waitlist.iter()).any(|p| p.matches_identity(&identity));
        if already_in {
            return Err(PadelTowerError::AlreadyEnrolled {
                event_id: event_id.to_string(),
                participant_id: identity,
            });
        }

        if let Some(slot) = event.players.iter().position(|p| p.is_vacancy()) {
            let sentinel = event.players[slot].id.clone();
            participant.current_court = event.players[slot].current_court;
            event.players[slot] = participant.clone();
            self.store
                .update_event(event_id, UpdateEventRequest { players: Some(event.players), ..Default::default() })
                .await?;

            let matches_updated = self.fill_match_slots(event_id, &sentinel, &participant).await?;
            info!(event_id = event_id, participant_id = %identity, matches_updated = matches_updated, "Participant filled a vacancy");
            return Ok(Enrollment::FilledVacancy { matches_updated });
        }

        if event.is_full() {
            event.waitlist.push(participant);
            let position = event.waitlist.len();
            self.store
                .update_event(event_id, UpdateEventRequest { waitlist: Some(event.waitlist), ..Default::default() })
                .await?;
            info!(event_id = event_id, participant_id = %identity, position = position, "Event full, participant added to waitlist");
            return Ok(Enrollment::Waitlisted { position });
        }

        event.players.push(participant);
        let count = event.enrolled_count();
        self.store
            .update_event(event_id, UpdateEventRequest { players: Some(event.players), ..Default::default() })
            .await?;
        info!(event_id = event_id, participant_id = %identity, count = count, "Participant enrolled");
        Ok(Enrollment::Enrolled { count })
    }

    /// Hand the pending match slots held by `sentinel` to `replacement`.
    /// A bare sentinel is shared by every untied vacancy, so it only gives
    /// up one slot.
    async fn fill_match_slots(&self, event_id: &str, sentinel: &str, replacement: &Participant) -> Result<usize> {
        let mut updated = 0;
        for mut m in self.pending_matches_with(event_id, sentinel).await? {
            let changed = if sentinel == VACANCY_ID {
                m.substitute_first(sentinel, replacement.identity(), &replacement.name)
            } else {
                m.substitute(sentinel, replacement.identity(), &replacement.name)
            };
            if changed {
                self.store.update_match(&m.id, UpdateMatchRequest::teams_of(&m)).await?;
                updated += 1;
                if sentinel == VACANCY_ID {
                    break;
                }
            }
        }
        Ok(updated)
    }

    /// Withdraw a participant from the roster or the waitlist
    pub async fn remove_participant(&self, event_id: &str, participant_id: &str) -> Result<Withdrawal> {
        let mut event = self.load_event(event_id).await?;

        let Some(slot) = event.players.iter().position(|p| p.matches_identity(participant_id)) else {
            return self.remove_from_waitlist(event, participant_id).await;
        };

        if event.players[slot].id.is_empty() {
            warn!(event_id = event_id, name = %event.players[slot].name, "Participant without id, matched by name");
        }

        let pending = self.pending_matches_with(event_id, participant_id).await?;
        let removed = event.players.remove(slot);
        let has_room = event.enrolled_count() < event.required_players();
        let promoted = if has_room && !event.waitlist.is_empty() {
            Some(event.waitlist.remove(0))
        } else {
            None
        };

        let replacement = if pending.is_empty() {
            // Nobody depends on the slot: drop it and append the promoted player
            if let Some(p) = &promoted {
                event.players.push(p.clone());
            }
            None
        } else {
            let mut replacement = promoted.clone().unwrap_or_else(|| Participant::vacancy_for(&removed));
            replacement.current_court = removed.current_court;
            event.players.insert(slot, replacement.clone());
            Some(replacement)
        };

        self.store
            .update_event(
                event_id,
                UpdateEventRequest {
                    players: Some(event.players),
                    waitlist: Some(event.waitlist),
                    ..Default::default()
                },
            )
            .await?;

        let mut matches_updated = 0;
        if let Some(replacement) = replacement {
            for mut m in pending {
                if m.substitute(participant_id, replacement.identity(), &replacement.name) {
                    self.store.update_match(&m.id, UpdateMatchRequest::teams_of(&m)).await?;
                    matches_updated += 1;
                }
            }
        }

        info!(
            event_id = event_id,
            participant_id = participant_id,
            promoted = promoted.as_ref().map(|p| p.identity()),
            matches_updated = matches_updated,
            "Participant withdrawn"
        );

        Ok(Withdrawal { removed, promoted, matches_updated })
    }

    async fn remove_from_waitlist(&self, mut event: Event, participant_id: &str) -> Result<Withdrawal> {
        let position = event
            .waitlist
            .iter()
            .position(|p| p.matches_identity(participant_id))
            .ok_or_else(|| PadelTowerError::ParticipantNotFound {
                event_id: event.id.clone(),
                participant_id: participant_id.to_string(),
            })?;

        let removed = event.waitlist.remove(position);
        self.store
            .update_event(&event.id, UpdateEventRequest { waitlist: Some(event.waitlist), ..Default::default() })
            .await?;
        info!(event_id = %event.id, participant_id = participant_id, "Participant left the waitlist");

        Ok(Withdrawal { removed, promoted: None, matches_updated: 0 })
    }

    /// Move the first waitlisted participant into the roster
    pub async fn promote_next(&self, event_id: &str) -> Result<Option<Participant>> {
        let mut event = self.load_event(event_id).await?;
        if event.waitlist.is_empty() {
            return Ok(None);
        }

        let promoted = event.waitlist.remove(0);
        event.players.push(promoted.clone());
        self.store
            .update_event(
                event_id,
                UpdateEventRequest {
                    players: Some(event.players),
                    waitlist: Some(event.waitlist),
                    ..Default::default()
                },
            )
            .await?;
        info!(event_id = event_id, participant_id = %promoted.identity(), "Participant promoted from waitlist");

        Ok(Some(promoted))
    }

    pub async fn get_waitlist(&self, event_id: &str) -> Result<Vec<Participant>> {
        Ok(self.load_event(event_id).await?.waitlist)
    }
}
