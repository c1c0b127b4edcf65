//! Database module
//!
//! This module handles the event store abstraction, its PostgreSQL and
//! in-memory implementations and connection management

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{ChangeChannel, ChangeListener, DatabasePool, create_pool, run_migrations, health_check};
pub use memory::InMemoryEventStore;
pub use repositories::{EventRepository, MatchRepository};
pub use service::DatabaseService;
pub use store::{EventStore, EventSnapshots, MatchSnapshots};
