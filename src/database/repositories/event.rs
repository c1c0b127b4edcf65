//! Event repository implementation

use sqlx::PgPool;
use sqlx::types::Json;
use chrono::{DateTime, Utc};
use crate::models::{Event, EventStatus, CreateEventRequest, UpdateEventRequest, Participant};
use crate::utils::errors::{PadelTowerError, Result};
use crate::utils::helpers::generate_uuid;

const EVENT_COLUMNS: &str = "id, kind, name, status, date, time, time_end, players, waitlist, max_courts, rounds, auto_started_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: String,
    kind: String,
    name: String,
    status: String,
    date: String,
    time: String,
    time_end: Option<String>,
    players: Json<Vec<Participant>>,
    waitlist: Json<Vec<Participant>>,
    max_courts: i32,
    rounds: i32,
    auto_started_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = PadelTowerError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Event {
            id: row.id,
            kind: row.kind.parse()?,
            name: row.name,
            status: row.status.parse()?,
            date: row.date,
            time: row.time,
            time_end: row.time_end,
            players: row.players.0,
            waitlist: row.waitlist.0,
            max_courts: row.max_courts.max(0) as u32,
            rounds: row.rounds.max(0) as u32,
            auto_started_at: row.auto_started_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event in `open` status
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (id, kind, name, status, date, time, time_end, max_courts, rounds, created_at, updated_at)
            VALUES ($1, $2, $3, 'open', $4, $5, $6, $7, $8, $9, $9)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(generate_uuid())
        .bind(request.kind.as_str())
        .bind(request.name)
        .bind(request.date)
        .bind(request.time)
        .bind(request.time_end)
        .bind(request.max_courts as i32)
        .bind(request.rounds as i32)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    /// Events the lifecycle still has to look after
    pub async fn list_active(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE status NOT IN ($1, $2) ORDER BY created_at, id",
            EVENT_COLUMNS
        ))
        .bind(EventStatus::Finished.as_str())
        .bind(EventStatus::Cancelled.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Event::try_from).collect()
    }

    /// Update event
    pub async fn update(&self, id: &str, request: UpdateEventRequest) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET status = COALESCE($2, status),
                players = COALESCE($3, players),
                waitlist = COALESCE($4, waitlist),
                max_courts = COALESCE($5, max_courts),
                auto_started_at = COALESCE($6, auto_started_at),
                updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(request.status.map(|s| s.as_str()))
        .bind(request.players.map(Json))
        .bind(request.waitlist.map(Json))
        .bind(request.max_courts.map(|c| c as i32))
        .bind(request.auto_started_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| PadelTowerError::EventNotFound { event_id: id.to_string() })?
            .try_into()
    }

    /// Delete event and, through the foreign key, its matches
    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
