use anyhow::{anyhow, Result};
use std::env;

use crate::pairing::{DrawRule, PairingSettings, DEFAULT_MAX_ATTEMPTS};
use crate::utils::validation::parse_admin_ids;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/santa.db";
const DEFAULT_PENDING_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub pairing: PairingSettings,
    /// How long an unanswered send command keeps waiting for its message.
    pub relay_pending_ttl_hours: i64,
    /// Operators allowed to manage every event.
    pub admin_ids: Vec<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = Self::database_url_from_env();

        let http_port = non_empty_var("HTTP_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let max_attempts = match non_empty_var("PAIRING_MAX_ATTEMPTS") {
            Some(value) => value
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts >= 1)
                .ok_or_else(|| anyhow!("Invalid PAIRING_MAX_ATTEMPTS, expected a number >= 1"))?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let draw_rule = match non_empty_var("PAIRING_DRAW_RULE") {
            Some(value) => value
                .parse::<DrawRule>()
                .map_err(|e| anyhow!("Invalid PAIRING_DRAW_RULE: {}", e))?,
            None => DrawRule::default(),
        };

        let relay_pending_ttl_hours = match non_empty_var("RELAY_PENDING_TTL_HOURS") {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours >= 1)
                .ok_or_else(|| anyhow!("Invalid RELAY_PENDING_TTL_HOURS, expected a number >= 1"))?,
            None => DEFAULT_PENDING_TTL_HOURS,
        };

        let admin_ids = match non_empty_var("ADMIN_IDS") {
            Some(value) => parse_admin_ids(&value).map_err(|e| anyhow!("Invalid ADMIN_IDS: {}", e))?,
            None => Vec::new(),
        };

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            pairing: PairingSettings {
                max_attempts,
                draw_rule,
            },
            relay_pending_ttl_hours,
            admin_ids,
        })
    }

    /// `DATABASE_URL` or the default, without requiring the bot token.
    pub fn database_url_from_env() -> String {
        non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }
}

/// File path of a `sqlite:` URL, `None` for in-memory or other databases.
pub fn sqlite_path(database_url: &str) -> Option<&str> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
