//! Participant model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Identity used for a withdrawn slot nobody has filled yet. Sentinels left
/// by a withdrawal carry the withdrawn identity after a `:`, which ties the
/// roster entry to the match slots it stands for.
pub const VACANCY_ID: &str = "vacante_id";
/// Display name of the vacancy sentinel
pub const VACANCY_NAME: &str = "VACANTE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, alias = "uid")]
    pub id: String,
    pub name: String,
    #[serde(rename = "joinedAt", default = "Utc::now")]
    pub joined_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_court: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_partner: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            joined_at,
            level: None,
            current_court: None,
            last_partner: None,
        }
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    /// A bare vacancy sentinel, not tied to any withdrawal
    pub fn vacancy(joined_at: DateTime<Utc>) -> Self {
        Self::new(VACANCY_ID, VACANCY_NAME, joined_at)
    }

    /// The vacancy left where `withdrawn` used to be
    pub fn vacancy_for(withdrawn: &Participant) -> Self {
        let mut vacancy = Self::new(
            format!("{}:{}", VACANCY_ID, withdrawn.identity()),
            VACANCY_NAME,
            withdrawn.joined_at,
        );
        vacancy.current_court = withdrawn.current_court;
        vacancy
    }

    pub fn is_vacancy(&self) -> bool {
        is_vacancy_id(&self.id)
    }

    /// Identity used for uniqueness. Records missing an id fall back to the name.
    pub fn identity(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    pub fn matches_identity(&self, id: &str) -> bool {
        !id.is_empty() && self.identity() == id
    }
}

/// True for the bare sentinel and for sentinels tied to a withdrawal
pub fn is_vacancy_id(id: &str) -> bool {
    id == VACANCY_ID || id.strip_prefix(VACANCY_ID).is_some_and(|rest| rest.starts_with(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_uid_alias() {
        let json = r#"{"uid":"p1","name":"Ana","joinedAt":"2026-01-10T10:00:00Z"}"#;
        let participant: Participant = serde_json::from_str(json).unwrap();
        assert_eq!(participant.id, "p1");
        assert_eq!(participant.identity(), "p1");
    }

    #[test]
    fn test_missing_id_falls_back_to_name() {
        let json = r#"{"name":"Luis"}"#;
        let participant: Participant = serde_json::from_str(json).unwrap();
        assert!(participant.id.is_empty());
        assert_eq!(participant.identity(), "Luis");
        assert!(participant.matches_identity("Luis"));
        assert!(!participant.matches_identity(""));
    }

    #[test]
    fn test_vacancy_sentinel() {
        let vacancy = Participant::vacancy(Utc::now());
        assert!(vacancy.is_vacancy());
        assert_eq!(vacancy.name, VACANCY_NAME);
    }

    #[test]
    fn test_vacancy_for_withdrawn_participant() {
        let mut withdrawn = Participant::new("p7", "Iker", Utc::now());
        withdrawn.current_court = Some(3);

        let vacancy = Participant::vacancy_for(&withdrawn);
        assert_eq!(vacancy.id, "vacante_id:p7");
        assert_eq!(vacancy.current_court, Some(3));
        assert!(vacancy.is_vacancy());
        assert!(is_vacancy_id("vacante_id"));
        assert!(!is_vacancy_id("vacante_idx"));
        assert!(!is_vacancy_id("p7"));
    }
}
