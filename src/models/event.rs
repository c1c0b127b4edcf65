//! Event model

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::utils::errors::PadelTowerError;
use super::participant::Participant;

/// Variant of an event. Both share every field and rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[serde(alias = "americana")]
    Tournament,
    #[serde(alias = "entreno")]
    Training,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Open,
    Pairing,
    Live,
    Finished,
    Cancelled,
    Adjusting,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::Pairing => "pairing",
            EventStatus::Live => "live",
            EventStatus::Finished => "finished",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Adjusting => "adjusting",
        }
    }

    /// Terminal statuses are never processed automatically again
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Finished | EventStatus::Cancelled)
    }

    /// Whether an operator may move an event from `self` to `to` by hand
    pub fn allows_manual(&self, to: EventStatus) -> bool {
        use EventStatus::*;
        match (self, to) {
            (from, _) if from.is_terminal() => false,
            (_, Cancelled) => true,
            (Pairing | Live, Adjusting) => true,
            (Adjusting, Live) => true,
            (Open | Pairing, Live) => true,
            _ => false,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = PadelTowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(EventStatus::Open),
            "pairing" => Ok(EventStatus::Pairing),
            "live" => Ok(EventStatus::Live),
            "finished" => Ok(EventStatus::Finished),
            "cancelled" => Ok(EventStatus::Cancelled),
            "adjusting" => Ok(EventStatus::Adjusting),
            other => Err(PadelTowerError::InvalidInput(format!("Unknown event status: {}", other))),
        }
    }
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Tournament => "tournament",
            EventKind::Training => "training",
        }
    }
}

impl FromStr for EventKind {
    type Err = PadelTowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tournament" | "americana" => Ok(EventKind::Tournament),
            "training" | "entreno" => Ok(EventKind::Training),
            other => Err(PadelTowerError::InvalidInput(format!("Unknown event kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    pub name: String,
    pub status: EventStatus,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub time_end: Option<String>,
    #[serde(default)]
    pub players: Vec<Participant>,
    #[serde(default)]
    pub waitlist: Vec<Participant>,
    pub max_courts: u32,
    pub rounds: u32,
    #[serde(default)]
    pub auto_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Players needed to fill every court
    pub fn required_players(&self) -> usize {
        self.max_courts as usize * 4
    }

    /// Distinct enrolled identities, vacancy sentinels excluded
    pub fn enrolled_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| !p.is_vacancy())
            .map(|p| p.identity())
            .filter(|id| !id.is_empty())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_count() >= self.required_players()
    }

    pub fn has_vacancy(&self) -> bool {
        self.players.iter().any(|p| p.is_vacancy())
    }

    pub fn find_player(&self, participant_id: &str) -> Option<&Participant> {
        self.players.iter().find(|p| p.matches_identity(participant_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub kind: EventKind,
    pub name: String,
    pub date: String,
    pub time: String,
    pub time_end: Option<String>,
    pub max_courts: u32,
    pub rounds: u32,
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub status: Option<EventStatus>,
    pub players: Option<Vec<Participant>>,
    pub waitlist: Option<Vec<Participant>>,
    pub max_courts: Option<u32>,
    pub auto_started_at: Option<DateTime<Utc>>,
}

impl UpdateEventRequest {
    pub fn status(status: EventStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    /// Apply the update to an in-memory copy
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(status) = self.status {
            event.status = status;
        }
        if let Some(players) = &self.players {
            event.players = players.clone();
        }
        if let Some(waitlist) = &self.waitlist {
            event.waitlist = waitlist.clone();
        }
        if let Some(max_courts) = self.max_courts {
            event.max_courts = max_courts;
        }
        if let Some(auto_started_at) = self.auto_started_at {
            event.auto_started_at = Some(auto_started_at);
        }
    }
}
