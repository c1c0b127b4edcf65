//! Database repositories module
//!
//! This module contains the repository implementations for data access

pub mod event;
pub mod match_record;

// Re-export repositories
pub use event::EventRepository;
pub use match_record::MatchRepository;
