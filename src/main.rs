//! # Secret Santa Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, starts the
//! relay janitor and the health server, and runs the Telegram bot.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secret_santa_bot::bot::handlers::{BotContext, BotHandler};
use secret_santa_bot::config::{sqlite_path, Config};
use secret_santa_bot::database::connection::DatabaseManager;
use secret_santa_bot::services::health::HealthService;
use secret_santa_bot::services::janitor::RelayJanitor;
use secret_santa_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secret_santa_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Secret Santa Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, draw rule: {}, max passes: {}, global admins: {}",
        config.database_url,
        config.http_port,
        config.pairing.draw_rule,
        config.pairing.max_attempts,
        config.admin_ids.len()
    );

    if let Some(parent) = sqlite_path(&config.database_url).and_then(|path| Path::new(path).parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let bot = Bot::new(&config.telegram_bot_token);
    let handler = BotHandler::new(BotContext {
        db: db_arc.as_ref().clone(),
        admin_ids: Arc::new(config.admin_ids.clone()),
        pairing: config.pairing,
    });

    let mut janitor = RelayJanitor::new(db_arc.clone(), config.relay_pending_ttl_hours).await?;
    match janitor.sweep_now().await {
        Ok(expired) => log_system_event("startup sweep", Some(&format!("{expired} stale pending relays removed"))),
        Err(e) => tracing::warn!("Startup sweep of pending relays failed: {}", e),
    }
    if let Err(e) = janitor.start().await {
        tracing::error!("Failed to start relay janitor: {}", e);
    }

    let health_service = HealthService::new(db_arc.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = janitor.stop().await {
        tracing::warn!("Error stopping relay janitor: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
