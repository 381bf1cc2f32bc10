//! HTTP status endpoints for orchestration health checks and operators.
//!
//! `/health/live` never touches the database, `/health/ready` and `/health`
//! do. `/stats` exposes aggregate counters only.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::database::{connection::DatabaseManager, models::EventStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

/// Nothing in here identifies a participant or a pairing.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub events_open: i64,
    pub events_closed: i64,
    pub events_distributed: i64,
    pub participants: i64,
    pub relayed_messages: i64,
    pub pending_relays: i64,
}

#[derive(Clone)]
struct StatusState {
    db: Arc<DatabaseManager>,
    started_at: Instant,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        let state = StatusState {
            db,
            started_at: Instant::now(),
        };

        let router = Router::new()
            .route("/health", get(health))
            .route("/health/ready", get(ready))
            .route("/health/live", get(|| async { Json("alive") }))
            .route("/stats", get(stats))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state);

        Self { router }
    }
}

/// Round trip to the database; `None` when it failed.
async fn ping_database(db: &DatabaseManager) -> Option<u64> {
    let start = Instant::now();
    match sqlx::query("SELECT 1").execute(&db.pool).await {
        Ok(_) => Some(start.elapsed().as_millis() as u64),
        Err(e) => {
            tracing::warn!("Database ping failed: {}", e);
            None
        }
    }
}

async fn health(State(state): State<StatusState>) -> Result<Json<HealthResponse>, StatusCode> {
    let response_time_ms = ping_database(&state.db).await.ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: "healthy".to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
        },
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

async fn ready(State(state): State<StatusState>) -> Result<Json<&'static str>, StatusCode> {
    ping_database(&state.db)
        .await
        .map(|_| Json("ready"))
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

async fn stats(State(state): State<StatusState>) -> Result<Json<StatsResponse>, StatusCode> {
    collect_stats(&state.db).await.map(Json).map_err(|e| {
        tracing::error!("Failed to collect stats: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })
}

pub async fn collect_stats(db: &DatabaseManager) -> Result<StatsResponse, sqlx::Error> {
    let by_status: Vec<(EventStatus, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM events GROUP BY status")
            .fetch_all(&db.pool)
            .await?;

    let mut stats = StatsResponse::default();
    for (status, count) in by_status {
        match status {
            EventStatus::RegisterOpen => stats.events_open = count,
            EventStatus::RegisterClosed => stats.events_closed = count,
            EventStatus::ParticipantsDistributed => stats.events_distributed = count,
        }
    }

    let (participants, relayed_messages, pending_relays): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM participants),
            (SELECT COUNT(*) FROM forward_messages),
            (SELECT COUNT(*) FROM pending_relays)
        "#,
    )
    .fetch_one(&db.pool)
    .await?;

    stats.participants = participants;
    stats.relayed_messages = relayed_messages;
    stats.pending_relays = pending_relays;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Event, EventKind, Participant, User};
    use axum_test::TestServer;
    use tempfile::TempDir;

    async fn status_server() -> (TestServer, Arc<DatabaseManager>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());

        let db = Arc::new(
            DatabaseManager::new(&db_url)
                .await
                .expect("Failed to create test database"),
        );
        db.run_migrations().await.expect("Failed to run migrations");

        let server = TestServer::new(HealthService::new(db.clone()).router)
            .expect("Failed to create test server");
        (server, db, temp_dir)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (server, _db, _temp_dir) = status_server().await;

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let health: HealthResponse = response.json();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.database.status, "healthy");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_readiness_and_liveness_endpoints() {
        let (server, _db, _temp_dir) = status_server().await;

        let ready = server.get("/health/ready").await;
        assert_eq!(ready.status_code(), StatusCode::OK);
        assert_eq!(ready.json::<String>(), "ready");

        let live = server.get("/health/live").await;
        assert_eq!(live.status_code(), StatusCode::OK);
        assert_eq!(live.json::<String>(), "alive");
    }

    #[tokio::test]
    async fn test_stats_endpoint_counts_events() {
        let (server, db, _temp_dir) = status_server().await;

        User::upsert(&db.pool, 1, None, "Admin".to_string(), None)
            .await
            .expect("Failed to insert user");
        let open = Event::create(&db.pool, 1, EventKind::Santa, "Open".to_string(), String::new())
            .await
            .expect("Failed to create event");
        let done = Event::create(&db.pool, 1, EventKind::Santa, "Done".to_string(), String::new())
            .await
            .expect("Failed to create event");
        Participant::create(&db.pool, open.id, 1)
            .await
            .expect("Failed to add participant");
        for (from, to) in [
            (EventStatus::RegisterOpen, EventStatus::RegisterClosed),
            (EventStatus::RegisterClosed, EventStatus::ParticipantsDistributed),
        ] {
            Event::transition(&db.pool, done.id, from, to)
                .await
                .expect("Failed to move event");
        }

        let response = server.get("/stats").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let stats: StatsResponse = response.json();
        assert_eq!(
            stats,
            StatsResponse {
                events_open: 1,
                events_closed: 0,
                events_distributed: 1,
                participants: 1,
                relayed_messages: 0,
                pending_relays: 0,
            }
        );
    }
}
