//! Time-driven status decisions
//!
//! Pure function of an event, its window and the current instant. The
//! coordinator applies whatever is decided here.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use crate::models::{Event, EventStatus};
use super::schedule::EventWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: EventStatus,
    pub to: EventStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Advance(Transition),
    /// The clock says move on but the roster is short
    AwaitingPlayers { enrolled: usize, required: usize },
    Idle,
}

/// Decide the automatic transition for one event. `live` is checked before
/// `pairing`, so an event whose start already passed goes straight to live.
pub fn decide(event: &Event, window: &EventWindow, now: DateTime<Utc>, pairing_lead: Duration) -> Decision {
    let advance = |to| Decision::Advance(Transition { from: event.status, to });
    let awaiting = || Decision::AwaitingPlayers {
        enrolled: event.enrolled_count(),
        required: event.required_players(),
    };

    match event.status {
        EventStatus::Live if window.has_ended(now) => advance(EventStatus::Finished),
        EventStatus::Open | EventStatus::Pairing if window.contains(now) => {
            if event.is_full() {
                advance(EventStatus::Live)
            } else {
                awaiting()
            }
        }
        EventStatus::Open if now < window.start && window.until_start(now) <= pairing_lead => {
            if event.is_full() {
                advance(EventStatus::Pairing)
            } else {
                awaiting()
            }
        }
        _ => Decision::Idle,
    }
}
