//! Read-time deduplication of match records
//!
//! Concurrent generation can leave the same pairing stored twice. Readers
//! collapse records sharing a [`MatchSignature`](crate::models::MatchSignature),
//! keeping the first one seen. The store itself is never modified here.

use std::collections::HashSet;
use tracing::warn;
use crate::models::Match;

/// Keep the first record of every signature, in input order
pub fn dedup_matches(matches: Vec<Match>) -> Vec<Match> {
    let mut seen = HashSet::with_capacity(matches.len());
    let mut kept = Vec::with_capacity(matches.len());

    for m in matches {
        if seen.insert(m.signature()) {
            kept.push(m);
        } else {
            warn!(
                match_id = %m.id,
                event_id = %m.event_id,
                round = m.round,
                court = m.court,
                "Duplicate match record ignored"
            );
        }
    }

    kept
}
