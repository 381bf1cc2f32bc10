use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite};

use crate::utils::datetime::now_rfc3339;

/// A Telegram user. The id is the Telegram user id, which is also the id of
/// the private chat with the bot.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub full_name: String,
    pub language_code: Option<String>,
    pub bot_can_message: bool,
    pub active_participant_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Inserts the user or refreshes their profile fields.
    pub async fn upsert(
        pool: &sqlx::SqlitePool,
        id: i64,
        username: Option<String>,
        full_name: String,
        language_code: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, full_name, language_code, bot_can_message, created_at, updated_at)
            VALUES (?, ?, ?, ?, TRUE, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                full_name = excluded.full_name,
                language_code = excluded.language_code,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(&username)
        .bind(&full_name)
        .bind(&language_code)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, language_code, bot_can_message, active_participant_id, created_at, updated_at FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_active_participant<'e, E>(
        executor: E,
        user_id: i64,
        participant_id: Option<i64>,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE users SET active_participant_id = ?, updated_at = ? WHERE id = ?")
            .bind(participant_id)
            .bind(now_rfc3339())
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Records whether the last message to this user went through.
    pub async fn set_bot_can_message(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        can_message: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET bot_can_message = ? WHERE id = ? AND bot_can_message != ?")
            .bind(can_message)
            .bind(user_id)
            .bind(can_message)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// `@username` when available, otherwise the full name.
    pub fn display_name(&self) -> String {
        display_name(self.username.as_deref(), &self.full_name)
    }
}

pub(crate) fn display_name(username: Option<&str>, full_name: &str) -> String {
    match username {
        Some(username) if !username.is_empty() => format!("@{username}"),
        _ if !full_name.trim().is_empty() => full_name.trim().to_string(),
        _ => "Anonymous elf".to_string(),
    }
}
