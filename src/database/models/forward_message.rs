use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::datetime::now_rfc3339;

/// Direction of an anonymous message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayRole {
    /// From a giver to the participant they drew.
    #[sqlx(rename = "buddy")]
    #[serde(rename = "buddy")]
    ToBuddy,
    /// From a participant back to whoever drew them.
    #[sqlx(rename = "santa")]
    #[serde(rename = "santa")]
    ToSanta,
}

impl RelayRole {
    pub fn tag(&self) -> &'static str {
        match self {
            RelayRole::ToBuddy => "buddy",
            RelayRole::ToSanta => "santa",
        }
    }
}

/// Audit record of one relayed message. Written once after a confirmed
/// delivery and never updated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ForwardMessage {
    pub id: String,
    /// Transport id of the copy delivered to the receiver.
    pub message_id: i64,
    pub role: RelayRole,
    pub from_participant_id: i64,
    pub to_participant_id: i64,
    pub created_at: String,
}

impl ForwardMessage {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        message_id: i64,
        role: RelayRole,
        from_participant_id: i64,
        to_participant_id: i64,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO forward_messages (id, message_id, role, from_participant_id, to_participant_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(message_id)
        .bind(role)
        .bind(from_participant_id)
        .bind(to_participant_id)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(ForwardMessage {
            id,
            message_id,
            role,
            from_participant_id,
            to_participant_id,
            created_at: now,
        })
    }

    pub async fn find_by_sender(
        pool: &sqlx::SqlitePool,
        participant_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ForwardMessage>(
            "SELECT id, message_id, role, from_participant_id, to_participant_id, created_at FROM forward_messages WHERE from_participant_id = ? ORDER BY created_at"
        )
        .bind(participant_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_event(
        pool: &sqlx::SqlitePool,
        event_id: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM forward_messages f
            JOIN participants p ON p.id = f.from_participant_id
            WHERE p.event_id = ?
            "#,
        )
        .bind(event_id)
        .fetch_one(pool)
        .await
    }
}
