//! State management module
//!
//! This module persists operator-side lifecycle state between restarts

pub mod storage;

// Re-export commonly used state components
pub use storage::{DismissalStore, RedisDismissalStore, MemoryDismissalStore};
