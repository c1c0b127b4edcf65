//! PadelTower
//!
//! Lifecycle coordinator for padel club events. Tournaments ("americanas")
//! and training sessions move from open enrollment through pairing to live
//! play on their schedule; rounds are generated with pozo court rotation and
//! operators follow each event through live sessions.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{PadelTowerError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, EventStore, InMemoryEventStore};
pub use lifecycle::{EventLifecycleCoordinator, LifecycleScheduler, LiveEventSession};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
