use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};

use super::{event::EventStatus, user::display_name};
use crate::utils::datetime::now_rfc3339;

/// A user's membership in one event.
///
/// `recipient_id` is the only stored half of the pairing. Who drew a
/// participant is always answered by querying for `recipient_id = id`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub recipient_id: Option<i64>,
    pub created_at: String,
}

/// Participant joined with the public part of their user profile.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub participant_id: i64,
    pub user_id: i64,
    pub recipient_id: Option<i64>,
    pub username: Option<String>,
    pub full_name: String,
    pub bot_can_message: bool,
}

impl ParticipantProfile {
    pub fn display_name(&self) -> String {
        display_name(self.username.as_deref(), &self.full_name)
    }
}

const PARTICIPANT_COLUMNS: &str = "id, event_id, user_id, recipient_id, created_at";

impl Participant {
    pub async fn create<'e, E>(
        executor: E,
        event_id: i64,
        user_id: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let now = now_rfc3339();

        let result = sqlx::query(
            "INSERT INTO participants (event_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(&now)
        .execute(executor)
        .await?;

        Ok(Participant {
            id: result.last_insert_rowid(),
            event_id,
            user_id,
            recipient_id: None,
            created_at: now,
        })
    }

    /// Registers the user only while the event still accepts participants.
    ///
    /// The status check and the insert are one statement, so a join cannot
    /// slip in after registration was closed. Returns `None` when the event is
    /// not open (or does not exist).
    pub async fn create_if_open(
        pool: &sqlx::SqlitePool,
        event_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let now = now_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO participants (event_id, user_id, created_at)
            SELECT ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM events WHERE id = ? AND status = ?)
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(&now)
        .bind(event_id)
        .bind(EventStatus::RegisterOpen)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(Participant {
            id: result.last_insert_rowid(),
            event_id,
            user_id,
            recipient_id: None,
            created_at: now,
        }))
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        participant_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?"
        ))
        .bind(participant_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_event_and_user(
        pool: &sqlx::SqlitePool,
        event_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = ? AND user_id = ?"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_event(
        pool: &sqlx::SqlitePool,
        event_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE event_id = ? ORDER BY id"
        ))
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE user_id = ? ORDER BY event_id"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn profiles_for_event(
        pool: &sqlx::SqlitePool,
        event_id: i64,
    ) -> Result<Vec<ParticipantProfile>, sqlx::Error> {
        sqlx::query_as::<_, ParticipantProfile>(
            r#"
            SELECT p.id AS participant_id, p.user_id, p.recipient_id,
                   u.username, u.full_name, u.bot_can_message
            FROM participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.event_id = ?
            ORDER BY p.id
            "#,
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    /// The participant this one gives a gift to.
    pub async fn recipient(
        &self,
        pool: &sqlx::SqlitePool,
    ) -> Result<Option<Participant>, sqlx::Error> {
        match self.recipient_id {
            Some(recipient_id) => Self::find_by_id(pool, recipient_id).await,
            None => Ok(None),
        }
    }

    /// The participant who drew this one, found by reverse lookup.
    pub async fn santa(
        &self,
        pool: &sqlx::SqlitePool,
    ) -> Result<Option<Participant>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE recipient_id = ? AND event_id = ?"
        ))
        .bind(self.id)
        .bind(self.event_id)
        .fetch_optional(pool)
        .await
    }

    /// Removes a membership unless the event has already been distributed.
    ///
    /// Returns `false` when nothing was deleted.
    pub async fn delete_before_distribution(
        pool: &sqlx::SqlitePool,
        event_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM participants
            WHERE event_id = ? AND user_id = ?
              AND EXISTS (SELECT 1 FROM events WHERE id = ? AND status != ?)
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(event_id)
        .bind(EventStatus::ParticipantsDistributed)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
