//! Round generation
//!
//! [`PozoMatchGenerator`] implements the rotating "pozo" ladder: after each
//! round winners climb one court and losers drop one, players are re-packed
//! four per court and partners rotate so nobody repeats the partner they just
//! played with.

use std::collections::HashMap;
use async_trait::async_trait;
use tracing::{debug, warn};
use crate::models::{Event, EventKind, Match, NewMatch, Participant};
use crate::utils::errors::Result;

const PLAYERS_PER_COURT: usize = 4;

/// Output of a generator run: the matches of the new round and the players
/// with their updated court and partner bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct RoundPlan {
    pub matches: Vec<NewMatch>,
    pub players: Vec<Participant>,
}

/// Produces the matches of one round
#[async_trait]
pub trait MatchGenerator: Send + Sync {
    /// `previous` holds the matches of `round - 1`; it is empty for round 1
    async fn generate(&self, event: &Event, round: u32, previous: &[Match]) -> Result<RoundPlan>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PozoMatchGenerator;

impl PozoMatchGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Initial court assignment. Training sessions seed by level, tournaments
    /// by enrollment order.
    fn seed_courts(event: &Event) -> Vec<Participant> {
        let mut players: Vec<Participant> = event.players.iter().filter(|p| !p.is_vacancy()).cloned().collect();

        if event.kind == EventKind::Training {
            players.sort_by(|a, b| {
                let level_a = a.level.unwrap_or(0.0);
                let level_b = b.level.unwrap_or(0.0);
                level_b.total_cmp(&level_a).then_with(|| a.identity().cmp(b.identity()))
            });
        }

        for (index, player) in players.iter_mut().enumerate() {
            player.current_court = Some((index / PLAYERS_PER_COURT) as u32 + 1);
        }
        players
    }

    /// Move players up or down one court from the finished results of the
    /// previous round, then re-pack four per court
    fn rotate_courts(event: &Event, previous: &[Match]) -> Vec<Participant> {
        let max_courts = event.max_courts.max(1);

        struct Standing {
            player: Participant,
            court: u32,
            played: bool,
            won: bool,
        }

        let mut standings: Vec<Standing> = event
            .players
            .iter()
            .filter(|p| !p.is_vacancy())
            .map(|p| Standing {
                player: p.clone(),
                court: p.current_court.unwrap_or(max_courts),
                played: false,
                won: false,
            })
            .collect();
        let index: HashMap<String, usize> = standings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.player.identity().to_string(), i))
            .collect();

        for m in previous.iter().filter(|m| m.is_finished()) {
            // Draws favour team A
            let winners = if m.score_b > m.score_a { &m.team_b_ids } else { &m.team_a_ids };

            for team in [&m.team_a_ids, &m.team_b_ids] {
                for id in team {
                    let Some(&i) = index.get(id) else { continue };
                    let standing = &mut standings[i];
                    standing.played = true;
                    standing.won = winners.contains(id);
                    if let Some(partner) = team.iter().find(|other| *other != id) {
                        standing.player.last_partner = Some(partner.clone());
                    }
                }
            }
        }

        for standing in standings.iter_mut().filter(|s| s.played) {
            if standing.won {
                standing.court = standing.court.saturating_sub(1).max(1);
            } else {
                standing.court = (standing.court + 1).min(max_courts);
            }
        }

        standings.sort_by(|a, b| a.court.cmp(&b.court).then_with(|| a.player.identity().cmp(b.player.identity())));
        standings
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let mut player = s.player;
                player.current_court = Some((i / PLAYERS_PER_COURT) as u32 + 1);
                player
            })
            .collect()
    }

    /// First 2v2 split that repeats no partner from the previous round
    fn smart_pairs(group: &[&Participant]) -> (Vec<Participant>, Vec<Participant>) {
        let splits = [[0, 1, 2, 3], [0, 2, 1, 3], [0, 3, 1, 2]];
        let repeats = |a: &Participant, b: &Participant| {
            a.last_partner.as_deref() == Some(b.identity()) || b.last_partner.as_deref() == Some(a.identity())
        };

        let chosen = splits
            .iter()
            .find(|s| !repeats(group[s[0]], group[s[1]]) && !repeats(group[s[2]], group[s[3]]))
            .unwrap_or(&splits[1]);

        (
            vec![group[chosen[0]].clone(), group[chosen[1]].clone()],
            vec![group[chosen[2]].clone(), group[chosen[3]].clone()],
        )
    }

    fn build_matches(event: &Event, round: u32, players: &[Participant]) -> Vec<NewMatch> {
        let mut matches = Vec::new();

        for court in 1..=event.max_courts {
            let group: Vec<&Participant> = players.iter().filter(|p| p.current_court == Some(court)).collect();
            if group.len() < PLAYERS_PER_COURT {
                warn!(event_id = %event.id, round = round, court = court, players = group.len(), "Court skipped, not enough players");
                continue;
            }

            let (team_a, team_b) = Self::smart_pairs(&group[..PLAYERS_PER_COURT]);
            matches.push(NewMatch {
                event_id: event.id.clone(),
                round,
                court,
                team_a_ids: team_a.iter().map(|p| p.identity().to_string()).collect(),
                team_b_ids: team_b.iter().map(|p| p.identity().to_string()).collect(),
                team_a_names: team_a.iter().map(|p| p.name.clone()).collect(),
                team_b_names: team_b.iter().map(|p| p.name.clone()).collect(),
            });
        }

        matches
    }

    /// Synchronous core shared by the trait implementation and tests
    pub fn plan(&self, event: &Event, round: u32, previous: &[Match]) -> RoundPlan {
        let players = if round <= 1 {
            Self::seed_courts(event)
        } else {
            Self::rotate_courts(event, previous)
        };
        let matches = Self::build_matches(event, round, &players);
        debug!(event_id = %event.id, round = round, matches = matches.len(), "Pozo round planned");

        RoundPlan { matches, players }
    }
}

#[async_trait]
impl MatchGenerator for PozoMatchGenerator {
    async fn generate(&self, event: &Event, round: u32, previous: &[Match]) -> Result<RoundPlan> {
        Ok(self.plan(event, round, previous))
    }
}
