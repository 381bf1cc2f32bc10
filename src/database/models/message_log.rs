use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::datetime::now_rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    /// Sent by a user to the bot.
    Inbound,
    /// Sent by the bot.
    Outbound,
}

/// One row of the message log. Only metadata is kept, never the text or
/// media of the message itself.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub id: i64,
    pub message_id: Option<i64>,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub direction: MessageDirection,
    pub content_type: String,
    pub event_id: Option<i64>,
    pub created_at: String,
}

/// A message about to be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoggedMessage {
    pub message_id: Option<i64>,
    pub chat_id: i64,
    /// Users the bot has never seen are stored as `NULL`.
    pub user_id: Option<i64>,
    pub direction: MessageDirection,
    pub content_type: String,
    /// Falls back to the user's active event when `None`.
    pub event_id: Option<i64>,
}

impl LoggedMessage {
    /// Appends `entry` to the log. Returns `false` when the chat message was
    /// logged before.
    pub async fn record(
        pool: &sqlx::SqlitePool,
        entry: &NewLoggedMessage,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (message_id, chat_id, user_id, direction, content_type, event_id, created_at)
            VALUES (
                ?, ?,
                (SELECT id FROM users WHERE id = ?),
                ?, ?,
                COALESCE(
                    (SELECT id FROM events WHERE id = ?),
                    (SELECT p.event_id FROM users u JOIN participants p ON p.id = u.active_participant_id WHERE u.id = ?)
                ),
                ?
            )
            ON CONFLICT(chat_id, message_id) DO NOTHING
            "#,
        )
        .bind(entry.message_id)
        .bind(entry.chat_id)
        .bind(entry.user_id)
        .bind(entry.direction)
        .bind(&entry.content_type)
        .bind(entry.event_id)
        .bind(entry.user_id)
        .bind(now_rfc3339())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, LoggedMessage>(
            "SELECT id, message_id, chat_id, user_id, direction, content_type, event_id, created_at FROM messages WHERE user_id = ? ORDER BY id"
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_event(
        pool: &sqlx::SqlitePool,
        event_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE event_id = ?")
            .bind(event_id)
            .fetch_one(pool)
            .await
    }
}
