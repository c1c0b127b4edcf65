//! Round completion detection and prompt dismissal bookkeeping

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};
use crate::models::Match;

/// Offer to generate the round after a completed one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPrompt {
    pub event_id: String,
    pub completed_round: u32,
    pub next_round: u32,
}

/// A dismissed prompt, valid while round `round` stays exactly as it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDismissal {
    pub round: u32,
    pub fingerprint: u64,
}

pub fn latest_round(matches: &[Match]) -> Option<u32> {
    matches.iter().map(|m| m.round).max()
}

/// True when `round` has matches, all finished, and nothing exists after it
pub fn is_round_complete(matches: &[Match], round: u32) -> bool {
    let mut in_round = matches.iter().filter(|m| m.round == round).peekable();
    in_round.peek().is_some()
        && in_round.all(|m| m.is_finished())
        && !matches.iter().any(|m| m.round == round + 1)
}

/// The latest round when it is complete and another round is allowed
pub fn completed_round(matches: &[Match], round_limit: u32) -> Option<u32> {
    let latest = latest_round(matches)?;
    if latest >= round_limit || !is_round_complete(matches, latest) {
        return None;
    }
    Some(latest)
}

/// Digest of the state (status and score) of every match in `round`
pub fn round_fingerprint(matches: &[Match], round: u32) -> u64 {
    let mut state: Vec<(&str, &str, u32, u32)> = matches
        .iter()
        .filter(|m| m.round == round)
        .map(|m| (m.id.as_str(), m.status.as_str(), m.score_a, m.score_b))
        .collect();
    state.sort();

    let mut hasher = DefaultHasher::new();
    state.hash(&mut hasher);
    hasher.finish()
}

/// Remembers dismissed prompts per event
#[derive(Debug, Default)]
pub struct RoundPromptTracker {
    dismissed: HashMap<String, PromptDismissal>,
}

impl RoundPromptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dismiss(&mut self, event_id: &str, dismissal: PromptDismissal) {
        self.dismissed.insert(event_id.to_string(), dismissal);
    }

    pub fn get(&self, event_id: &str) -> Option<PromptDismissal> {
        self.dismissed.get(event_id).copied()
    }

    pub fn clear(&mut self, event_id: &str) {
        self.dismissed.remove(event_id);
    }

    /// Whether the prompt for `round` should be shown. A dismissal whose
    /// round or fingerprint no longer matches is dropped.
    pub fn should_prompt(&mut self, event_id: &str, round: u32, fingerprint: u64) -> bool {
        match self.dismissed.get(event_id) {
            Some(d) if d.round == round && d.fingerprint == fingerprint => false,
            Some(_) => {
                self.dismissed.remove(event_id);
                true
            }
            None => true,
        }
    }
}
