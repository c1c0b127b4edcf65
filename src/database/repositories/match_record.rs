//! Match repository implementation

use sqlx::PgPool;
use sqlx::types::Json;
use chrono::{DateTime, Utc};
use crate::models::{Match, NewMatch, UpdateMatchRequest};
use crate::utils::errors::{PadelTowerError, Result};
use crate::utils::helpers::generate_uuid;

const MATCH_COLUMNS: &str = "id, americana_id, round, court, team_a_ids, team_b_ids, team_a_names, team_b_names, score_a, score_b, status, created_at";

#[derive(Debug, sqlx::FromRow)]
struct MatchRow {
    id: String,
    americana_id: String,
    round: i32,
    court: i32,
    team_a_ids: Json<Vec<String>>,
    team_b_ids: Json<Vec<String>>,
    team_a_names: Json<Vec<String>>,
    team_b_names: Json<Vec<String>>,
    score_a: i32,
    score_b: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MatchRow> for Match {
    type Error = PadelTowerError;

    fn try_from(row: MatchRow) -> Result<Self> {
        Ok(Match {
            id: row.id,
            event_id: row.americana_id,
            round: row.round.max(0) as u32,
            court: row.court.max(0) as u32,
            team_a_ids: row.team_a_ids.0,
            team_b_ids: row.team_b_ids.0,
            team_a_names: row.team_a_names.0,
            team_b_names: row.team_b_names.0,
            score_a: row.score_a.max(0) as u32,
            score_b: row.score_b.max(0) as u32,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MatchRepository {
    pool: PgPool,
}

impl MatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a generated round in one transaction
    pub async fn create_many(&self, matches: Vec<NewMatch>) -> Result<Vec<Match>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(matches.len());

        for m in matches {
            let row = sqlx::query_as::<_, MatchRow>(&format!(
                r#"
                INSERT INTO matches (id, americana_id, round, court, team_a_ids, team_b_ids, team_a_names, team_b_names, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {}
                "#,
                MATCH_COLUMNS
            ))
            .bind(generate_uuid())
            .bind(m.event_id)
            .bind(m.round as i32)
            .bind(m.court as i32)
            .bind(Json(m.team_a_ids))
            .bind(Json(m.team_b_ids))
            .bind(Json(m.team_a_names))
            .bind(Json(m.team_b_names))
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;
            created.push(Match::try_from(row)?);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Find match by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Match>> {
        let row = sqlx::query_as::<_, MatchRow>(&format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Match::try_from).transpose()
    }

    /// All matches of an event. `seq` keeps duplicates in insertion order.
    pub async fn find_by_event(&self, event_id: &str) -> Result<Vec<Match>> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {} FROM matches WHERE americana_id = $1 ORDER BY round, court, seq",
            MATCH_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Match::try_from).collect()
    }

    /// Update match
    pub async fn update(&self, id: &str, request: UpdateMatchRequest) -> Result<Match> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            r#"
            UPDATE matches
            SET score_a = COALESCE($2, score_a),
                score_b = COALESCE($3, score_b),
                status = COALESCE($4, status),
                team_a_ids = COALESCE($5, team_a_ids),
                team_b_ids = COALESCE($6, team_b_ids),
                team_a_names = COALESCE($7, team_a_names),
                team_b_names = COALESCE($8, team_b_names)
            WHERE id = $1
            RETURNING {}
            "#,
            MATCH_COLUMNS
        ))
        .bind(id)
        .bind(request.score_a.map(|s| s as i32))
        .bind(request.score_b.map(|s| s as i32))
        .bind(request.status.map(|s| s.as_str()))
        .bind(request.team_a_ids.map(Json))
        .bind(request.team_b_ids.map(Json))
        .bind(request.team_a_names.map(Json))
        .bind(request.team_b_names.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| PadelTowerError::MatchNotFound { match_id: id.to_string() })?
            .try_into()
    }

    pub async fn delete_round(&self, event_id: &str, round: u32) -> Result<u64> {
        let result = sqlx::query("DELETE FROM matches WHERE americana_id = $1 AND round = $2")
            .bind(event_id)
            .bind(round as i32)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_after_round(&self, event_id: &str, round: u32) -> Result<u64> {
        let result = sqlx::query("DELETE FROM matches WHERE americana_id = $1 AND round > $2")
            .bind(event_id)
            .bind(round as i32)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_by_event(&self, event_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM matches WHERE americana_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
