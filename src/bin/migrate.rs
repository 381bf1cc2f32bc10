//! Schema management for the bot database, usable without a bot token.

use anyhow::{anyhow, Result};
use secret_santa_bot::config::{sqlite_path, Config};
use secret_santa_bot::database::connection::DatabaseManager;
use std::env;
use std::io;
use std::path::Path;
use std::process::ExitCode;

/// Tables the bot cannot run without.
const EXPECTED_TABLES: &[&str] = &[
    "users",
    "events",
    "participants",
    "forward_messages",
    "pending_relays",
    "messages",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Up,
    Check,
    Reset,
    Help,
}

impl Action {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.unwrap_or("up") {
            "migrate" | "up" => Some(Action::Up),
            "check" => Some(Action::Check),
            "reset" => Some(Action::Reset),
            "help" | "--help" | "-h" => Some(Action::Help),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    dotenvy::dotenv().ok();

    let arg = env::args().nth(1);
    let Some(action) = Action::parse(arg.as_deref()) else {
        eprintln!("Unknown command: {}", arg.unwrap_or_default());
        print_help();
        return ExitCode::FAILURE;
    };

    let database_url = Config::database_url_from_env();
    let result = match action {
        Action::Up => migrate_up(&database_url).await,
        Action::Check => check(&database_url).await,
        Action::Reset => reset(&database_url).await,
        Action::Help => {
            print_help();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn connect(database_url: &str) -> Result<DatabaseManager> {
    println!("📊 Database: {}", mask_url(database_url));

    if let Some(parent) = sqlite_path(database_url).and_then(|path| Path::new(path).parent()) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            println!("📁 Creating directory: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    DatabaseManager::new(database_url)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))
}

async fn migrate_up(database_url: &str) -> Result<()> {
    let db = connect(database_url).await?;

    println!("🚀 Applying migrations...");
    db.run_migrations()
        .await
        .map_err(|e| anyhow!("Migration failed: {}", e))?;

    println!("✅ Schema is up to date");
    Ok(())
}

async fn check(database_url: &str) -> Result<()> {
    let db = connect(database_url).await?;
    let tables = db.table_names().await?;

    println!("📋 Tables:");
    for table in &tables {
        println!("  • {table}");
    }

    let missing = missing_tables(&tables);
    if missing.is_empty() {
        println!("✅ Schema looks complete");
        Ok(())
    } else {
        println!("💡 Run 'migrate up' to create the schema");
        Err(anyhow!("Missing tables: {}", missing.join(", ")))
    }
}

/// Deletes the SQLite file (and its WAL side files) and migrates from scratch.
async fn reset(database_url: &str) -> Result<()> {
    let db_path = sqlite_path(database_url)
        .ok_or_else(|| anyhow!("Reset is only supported for SQLite database files"))?;

    println!("⚠️  This deletes ALL events, pairings and relayed message records in {db_path}");
    println!("Type 'yes' to continue:");

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    if !input.trim().eq_ignore_ascii_case("yes") {
        println!("Reset cancelled.");
        return Ok(());
    }

    for suffix in ["", "-wal", "-shm"] {
        let file = format!("{db_path}{suffix}");
        if Path::new(&file).exists() {
            std::fs::remove_file(&file)?;
            println!("🗑️  Deleted {file}");
        }
    }

    migrate_up(database_url).await
}

fn missing_tables(present: &[String]) -> Vec<&'static str> {
    EXPECTED_TABLES
        .iter()
        .copied()
        .filter(|expected| !present.iter().any(|t| t == expected))
        .collect()
}

/// Only the file name is printed; the directory may reveal the host layout.
fn mask_url(url: &str) -> String {
    match sqlite_path(url).and_then(|path| Path::new(path).file_name()) {
        Some(filename) => format!("sqlite:.../{}", filename.to_string_lossy()),
        None => url.to_string(),
    }
}

fn print_help() {
    println!("🎅 Secret Santa Bot - database tool");
    println!();
    println!("USAGE:");
    println!("    migrate [up|check|reset|help]");
    println!();
    println!("    up      Apply pending migrations (default, alias: migrate)");
    println!("    check   List tables and fail if the schema is incomplete");
    println!("    reset   Delete the SQLite database and recreate it. DESTRUCTIVE");
    println!();
    println!("DATABASE_URL selects the database (default: sqlite:./data/santa.db)");
}
