#![allow(clippy::unwrap_used)]

use secret_santa_bot::config::{sqlite_path, Config};
use secret_santa_bot::pairing::{DrawRule, DEFAULT_MAX_ATTEMPTS};
use std::env;
use std::sync::Mutex;
use tokio_test::{assert_err, assert_ok};

// Mutex to ensure config tests run sequentially to avoid environment variable conflicts
static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

const VARS: [&str; 7] = [
    "TELEGRAM_BOT_TOKEN",
    "DATABASE_URL",
    "HTTP_PORT",
    "PAIRING_MAX_ATTEMPTS",
    "PAIRING_DRAW_RULE",
    "RELAY_PENDING_TTL_HOURS",
    "ADMIN_IDS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

fn expect_error(var: &str, value: &str, message: &str) {
    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    env::set_var(var, value);

    let error = assert_err!(Config::from_env()).to_string();
    assert!(error.contains(message), "{var}={value}: unexpected error {error}");

    env::remove_var(var);
}

#[test]
fn test_config_from_env_with_all_vars() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "test_token_123");
    env::set_var("DATABASE_URL", "sqlite:test.db");
    env::set_var("HTTP_PORT", "8080");
    env::set_var("PAIRING_MAX_ATTEMPTS", "25");
    env::set_var("PAIRING_DRAW_RULE", "lookahead");
    env::set_var("RELAY_PENDING_TTL_HOURS", "6");
    env::set_var("ADMIN_IDS", "100, 200");

    let config = assert_ok!(Config::from_env());

    assert_eq!(config.telegram_bot_token, "test_token_123");
    assert_eq!(config.database_url, "sqlite:test.db");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.pairing.max_attempts, 25);
    assert_eq!(config.pairing.draw_rule, DrawRule::Lookahead);
    assert_eq!(config.relay_pending_ttl_hours, 6);
    assert_eq!(config.admin_ids, vec![100, 200]);

    clear_env();
}

#[test]
fn test_config_from_env_with_defaults() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "required_token");
    // Blank values count as unset.
    env::set_var("HTTP_PORT", "  ");

    let config = assert_ok!(Config::from_env());

    assert_eq!(config.database_url, "sqlite:./data/santa.db");
    assert_eq!(config.http_port, 3000);
    assert_eq!(config.pairing.draw_rule, DrawRule::Strict);
    assert_eq!(config.pairing.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(config.relay_pending_ttl_hours, 24);
    assert!(config.admin_ids.is_empty());

    clear_env();
}

#[test]
fn test_config_missing_required_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    let error = assert_err!(Config::from_env()).to_string();
    assert!(error.contains("TELEGRAM_BOT_TOKEN must be set"));

    env::set_var("TELEGRAM_BOT_TOKEN", "   ");
    assert_err!(Config::from_env());

    clear_env();
}

#[test]
fn test_config_rejects_invalid_values() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    expect_error("HTTP_PORT", "not_a_number", "Invalid HTTP_PORT");
    expect_error("HTTP_PORT", "70000", "Invalid HTTP_PORT");
    expect_error("PAIRING_MAX_ATTEMPTS", "0", "Invalid PAIRING_MAX_ATTEMPTS");
    expect_error("PAIRING_MAX_ATTEMPTS", "-3", "Invalid PAIRING_MAX_ATTEMPTS");
    expect_error("PAIRING_DRAW_RULE", "fastest", "Invalid PAIRING_DRAW_RULE");
    expect_error("RELAY_PENDING_TTL_HOURS", "0", "Invalid RELAY_PENDING_TTL_HOURS");
    expect_error("ADMIN_IDS", "12,abc", "Invalid ADMIN_IDS");

    clear_env();
}

#[test]
fn test_database_url_without_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    assert_eq!(Config::database_url_from_env(), "sqlite:./data/santa.db");
    env::set_var("DATABASE_URL", "sqlite:/var/lib/santa/santa.db");
    assert_eq!(Config::database_url_from_env(), "sqlite:/var/lib/santa/santa.db");

    clear_env();
}

#[test]
fn test_sqlite_path() {
    assert_eq!(sqlite_path("sqlite:./data/santa.db"), Some("./data/santa.db"));
    assert_eq!(sqlite_path("sqlite:///tmp/santa.db"), Some("/tmp/santa.db"));
    assert_eq!(sqlite_path("sqlite:santa.db?mode=rwc"), Some("santa.db"));
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("sqlite:"), None);
    assert_eq!(sqlite_path("postgres://localhost/santa"), None);
}
