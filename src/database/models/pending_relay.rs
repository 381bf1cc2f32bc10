use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::forward_message::RelayRole;
use crate::utils::datetime::now_rfc3339;

/// "Awaiting payload" slot of a user: the next message they send is relayed
/// with this role from this participant. At most one per user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PendingRelay {
    pub user_id: i64,
    pub participant_id: i64,
    pub role: RelayRole,
    pub created_at: String,
}

impl PendingRelay {
    /// Binds the slot, replacing whatever was pending before.
    pub async fn bind(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        participant_id: i64,
        role: RelayRole,
    ) -> Result<Self, sqlx::Error> {
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO pending_relays (user_id, participant_id, role, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                participant_id = excluded.participant_id,
                role = excluded.role,
                created_at = excluded.created_at
            "#,
        )
        .bind(user_id)
        .bind(participant_id)
        .bind(role)
        .bind(&now)
        .execute(pool)
        .await?;

        Ok(PendingRelay {
            user_id,
            participant_id,
            role,
            created_at: now,
        })
    }

    pub async fn find(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PendingRelay>(
            "SELECT user_id, participant_id, role, created_at FROM pending_relays WHERE user_id = ?"
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Removes and returns the slot in one statement, so only one caller can
    /// ever consume it.
    pub async fn take(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Step the statement to completion; user_id is the key, so at most one row.
        let taken = sqlx::query_as::<_, PendingRelay>(
            "DELETE FROM pending_relays WHERE user_id = ? RETURNING user_id, participant_id, role, created_at"
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(taken.into_iter().next())
    }

    /// Drops the slot without relaying anything. Returns whether one existed.
    pub async fn clear(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_relays WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Expires slots created before `cutoff` (a stored-format timestamp).
    pub async fn delete_older_than(
        pool: &sqlx::SqlitePool,
        cutoff: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pending_relays WHERE created_at < ?")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
