//! Data models module
//!
//! This module contains the records shared by the store, the lifecycle
//! coordinator and the services

pub mod event;
pub mod participant;
pub mod match_record;

// Re-export commonly used models
pub use event::{Event, EventKind, EventStatus, CreateEventRequest, UpdateEventRequest};
pub use participant::{is_vacancy_id, Participant, VACANCY_ID, VACANCY_NAME};
pub use match_record::{Match, MatchStatus, MatchSignature, TeamSide, NewMatch, UpdateMatchRequest};
