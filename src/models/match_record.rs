//! Match model

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::participant::is_vacancy_id;
use crate::utils::errors::PadelTowerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, MatchStatus::Finished)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = PadelTowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" | "pending" => Ok(MatchStatus::Scheduled),
            "live" => Ok(MatchStatus::Live),
            "finished" => Ok(MatchStatus::Finished),
            other => Err(PadelTowerError::InvalidInput(format!("Unknown match status: {}", other))),
        }
    }
}

/// Which team a score command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    #[serde(rename = "score_a")]
    A,
    #[serde(rename = "score_b")]
    B,
}

impl FromStr for TeamSide {
    type Err = PadelTowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score_a" | "a" | "A" => Ok(TeamSide::A),
            "score_b" | "b" | "B" => Ok(TeamSide::B),
            other => Err(PadelTowerError::InvalidInput(format!("Unknown team side: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    #[serde(rename = "americana_id")]
    pub event_id: String,
    pub round: u32,
    pub court: u32,
    #[serde(default)]
    pub team_a_ids: Vec<String>,
    #[serde(default)]
    pub team_b_ids: Vec<String>,
    #[serde(default)]
    pub team_a_names: Vec<String>,
    #[serde(default)]
    pub team_b_names: Vec<String>,
    #[serde(default)]
    pub score_a: u32,
    #[serde(default)]
    pub score_b: u32,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

/// Identity used to collapse duplicated match records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchSignature {
    pub court: u32,
    pub round: u32,
    pub team_a: Vec<String>,
    pub team_b: Vec<String>,
}

impl Match {
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn signature(&self) -> MatchSignature {
        let mut team_a = self.team_a_names.clone();
        let mut team_b = self.team_b_names.clone();
        team_a.sort();
        team_b.sort();
        MatchSignature {
            court: self.court,
            round: self.round,
            team_a,
            team_b,
        }
    }

    pub fn score(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::A => self.score_a,
            TeamSide::B => self.score_b,
        }
    }

    pub fn set_score(&mut self, side: TeamSide, value: u32) {
        match side {
            TeamSide::A => self.score_a = value,
            TeamSide::B => self.score_b = value,
        }
    }

    /// New score after applying `delta`, clamped to the `u32` range
    pub fn adjusted_score(&self, side: TeamSide, delta: i32) -> u32 {
        let current = self.score(side) as i64;
        (current + delta as i64).clamp(0, u32::MAX as i64) as u32
    }

    pub fn involves(&self, participant_id: &str) -> bool {
        self.team_a_ids.iter().chain(self.team_b_ids.iter()).any(|id| id == participant_id)
    }

    pub fn has_vacancy(&self) -> bool {
        self.team_a_ids.iter().chain(self.team_b_ids.iter()).any(|id| is_vacancy_id(id))
    }

    /// Replace one participant in both teams. Returns true when a slot changed.
    pub fn substitute(&mut self, old_id: &str, new_id: &str, new_name: &str) -> bool {
        let mut changed = false;
        for (ids, names) in [
            (&mut self.team_a_ids, &mut self.team_a_names),
            (&mut self.team_b_ids, &mut self.team_b_names),
        ] {
            for (index, id) in ids.iter_mut().enumerate() {
                if id == old_id {
                    *id = new_id.to_string();
                    if let Some(name) = names.get_mut(index) {
                        *name = new_name.to_string();
                    }
                    changed = true;
                }
            }
        }
        changed
    }

    /// Replace only the first slot held by `old_id`
    pub fn substitute_first(&mut self, old_id: &str, new_id: &str, new_name: &str) -> bool {
        for (ids, names) in [
            (&mut self.team_a_ids, &mut self.team_a_names),
            (&mut self.team_b_ids, &mut self.team_b_names),
        ] {
            if let Some(index) = ids.iter().position(|id| id == old_id) {
                ids[index] = new_id.to_string();
                if let Some(name) = names.get_mut(index) {
                    *name = new_name.to_string();
                }
                return true;
            }
        }
        false
    }
}

/// A match produced by a generator, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMatch {
    pub event_id: String,
    pub round: u32,
    pub court: u32,
    pub team_a_ids: Vec<String>,
    pub team_b_ids: Vec<String>,
    pub team_a_names: Vec<String>,
    pub team_b_names: Vec<String>,
}

impl NewMatch {
    pub fn into_match(self, id: String, created_at: DateTime<Utc>) -> Match {
        Match {
            id,
            event_id: self.event_id,
            round: self.round,
            court: self.court,
            team_a_ids: self.team_a_ids,
            team_b_ids: self.team_b_ids,
            team_a_names: self.team_a_names,
            team_b_names: self.team_b_names,
            score_a: 0,
            score_b: 0,
            status: MatchStatus::Scheduled,
            created_at,
        }
    }
}

/// Partial match update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMatchRequest {
    pub score_a: Option<u32>,
    pub score_b: Option<u32>,
    pub status: Option<MatchStatus>,
    pub team_a_ids: Option<Vec<String>>,
    pub team_b_ids: Option<Vec<String>>,
    pub team_a_names: Option<Vec<String>>,
    pub team_b_names: Option<Vec<String>>,
}

impl UpdateMatchRequest {
    pub fn status(status: MatchStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn score(side: TeamSide, value: u32) -> Self {
        match side {
            TeamSide::A => Self { score_a: Some(value), ..Default::default() },
            TeamSide::B => Self { score_b: Some(value), ..Default::default() },
        }
    }

    /// Copy the team slots of `m` into an update
    pub fn teams_of(m: &Match) -> Self {
        Self {
            team_a_ids: Some(m.team_a_ids.clone()),
            team_b_ids: Some(m.team_b_ids.clone()),
            team_a_names: Some(m.team_a_names.clone()),
            team_b_names: Some(m.team_b_names.clone()),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, m: &mut Match) {
        if let Some(score_a) = self.score_a {
            m.score_a = score_a;
        }
        if let Some(score_b) = self.score_b {
            m.score_b = score_b;
        }
        if let Some(status) = self.status {
            m.status = status;
        }
        if let Some(ids) = &self.team_a_ids {
            m.team_a_ids = ids.clone();
        }
        if let Some(ids) = &self.team_b_ids {
            m.team_b_ids = ids.clone();
        }
        if let Some(names) = &self.team_a_names {
            m.team_a_names = names.clone();
        }
        if let Some(names) = &self.team_b_names {
            m.team_b_names = names.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Match {
        NewMatch {
            event_id: "e1".into(),
            round: 1,
            court: 2,
            team_a_ids: vec!["p1".into(), "p2".into()],
            team_b_ids: vec!["p3".into(), "p4".into()],
            team_a_names: vec!["Zoe".into(), "Ana".into()],
            team_b_names: vec!["Luis".into(), "Bea".into()],
        }
        .into_match("m1".into(), Utc::now())
    }

    #[test]
    fn test_signature_ignores_name_order() {
        let a = sample();
        let mut b = sample();
        b.id = "m2".into();
        b.team_a_names.reverse();
        assert_eq!(a.signature(), b.signature());

        b.court = 3;
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_adjusted_score_clamps_at_zero() {
        let mut m = sample();
        m.score_a = 2;
        assert_eq!(m.adjusted_score(TeamSide::A, -5), 0);
        assert_eq!(m.adjusted_score(TeamSide::A, 1), 3);
        assert_eq!(m.adjusted_score(TeamSide::B, -1), 0);
    }

    #[test]
    fn test_adjusted_score_saturates_at_max() {
        let mut m = sample();
        m.set_score(TeamSide::A, u32::MAX - 1);
        assert_eq!(m.adjusted_score(TeamSide::A, 5), u32::MAX);
    }

    #[test]
    fn test_substitute_updates_id_and_name() {
        let mut m = sample();
        assert!(m.substitute("p3", "p9", "Nora"));
        assert_eq!(m.team_b_ids, vec!["p9", "p4"]);
        assert_eq!(m.team_b_names, vec!["Nora", "Bea"]);
        assert!(!m.substitute("missing", "x", "X"));
    }

    #[test]
    fn test_legacy_field_names() {
        let json = r#"{"id":"m1","americana_id":"e1","round":1,"court":1,"status":"live","created_at":"2026-10-18T10:00:00Z"}"#;
        let m: Match = serde_json::from_str(json).unwrap();
        assert_eq!(m.event_id, "e1");
        assert_eq!(m.score_a, 0);
        assert_eq!("score_b".parse::<TeamSide>().unwrap(), TeamSide::B);
    }
}
