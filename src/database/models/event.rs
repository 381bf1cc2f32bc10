use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};

use crate::utils::datetime::now_rfc3339;

/// Flavour of the gift exchange. Changes the wording and the command used to
/// write to one's own gift giver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Santa,
    SaintNicholas,
}

impl EventKind {
    /// Name of the gift giver role, e.g. "Secret Santa".
    pub fn giver_title(&self) -> &'static str {
        match self {
            EventKind::Santa => "Secret Santa",
            EventKind::SaintNicholas => "Saint Nicholas",
        }
    }

    /// Command a recipient uses to write back to whoever drew them.
    pub fn relay_command(&self) -> &'static str {
        match self {
            EventKind::Santa => "/send_santa",
            EventKind::SaintNicholas => "/send_nicholas",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            EventKind::Santa => "🎅",
            EventKind::SaintNicholas => "🎁",
        }
    }
}

/// Lifecycle of an event.
///
/// `RegisterOpen` and `RegisterClosed` can be toggled by the admin.
/// `ParticipantsDistributed` is terminal and only reached through distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[repr(i32)]
pub enum EventStatus {
    RegisterOpen = 0,
    RegisterClosed = 1,
    ParticipantsDistributed = 2,
}

impl EventStatus {
    pub fn label(&self) -> &'static str {
        match self {
            EventStatus::RegisterOpen => "Registration open",
            EventStatus::RegisterClosed => "Registration closed",
            EventStatus::ParticipantsDistributed => "Participants distributed",
        }
    }

    pub fn accepts_participants(&self) -> bool {
        *self == EventStatus::RegisterOpen
    }

    pub fn is_distributed(&self) -> bool {
        *self == EventStatus::ParticipantsDistributed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub admin_id: i64,
    pub kind: EventKind,
    pub status: EventStatus,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

const EVENT_COLUMNS: &str = "id, admin_id, kind, status, name, description, created_at, updated_at";

impl Event {
    pub async fn create<'e, E>(
        executor: E,
        admin_id: i64,
        kind: EventKind,
        name: String,
        description: String,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let now = now_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO events (admin_id, kind, status, name, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(admin_id)
        .bind(kind)
        .bind(EventStatus::RegisterOpen)
        .bind(&name)
        .bind(&description)
        .bind(&now)
        .bind(&now)
        .execute(executor)
        .await?;

        Ok(Event {
            id: result.last_insert_rowid(),
            admin_id,
            kind,
            status: EventStatus::RegisterOpen,
            name,
            description,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        event_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
            .bind(event_id)
            .fetch_optional(pool)
            .await
    }

    /// Batch fetch events to avoid N+1 queries
    pub async fn find_by_ids(
        pool: &sqlx::SqlitePool,
        event_ids: &[i64],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = event_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id IN ({placeholders}) ORDER BY id"
        );

        let mut query_builder = sqlx::query_as::<_, Event>(&query);
        for event_id in event_ids {
            query_builder = query_builder.bind(event_id);
        }

        query_builder.fetch_all(pool).await
    }

    /// Moves the event from `from` to `to` only if it is still in `from`.
    ///
    /// Returns `false` when another writer got there first or the event does
    /// not exist; callers re-read the event to find out which.
    pub async fn transition<'e, E>(
        executor: E,
        event_id: i64,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE events SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(now_rfc3339())
        .bind(event_id)
        .bind(from)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn participant_count(
        pool: &sqlx::SqlitePool,
        event_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM participants WHERE event_id = ?")
            .bind(event_id)
            .fetch_one(pool)
            .await
    }

    /// Event admins and global bot operators may manage an event.
    pub fn is_managed_by(&self, user_id: i64, global_admins: &[i64]) -> bool {
        self.admin_id == user_id || global_admins.contains(&user_id)
    }
}
