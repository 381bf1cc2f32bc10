use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::database::{connection::DatabaseManager, models::PendingRelay};
use crate::utils::{datetime::cutoff_rfc3339, logging::log_system_event};

/// Every hour, on the hour.
const SWEEP_SCHEDULE: &str = "0 0 * * * *";

/// Expires "awaiting payload" bindings that were never followed up.
pub struct RelayJanitor {
    db: Arc<DatabaseManager>,
    ttl_hours: i64,
    scheduler: JobScheduler,
}

impl RelayJanitor {
    pub async fn new(db: Arc<DatabaseManager>, ttl_hours: i64) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            db,
            ttl_hours,
            scheduler,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        let db = self.db.clone();
        let ttl_hours = self.ttl_hours;

        let sweep_job = Job::new_async(SWEEP_SCHEDULE, move |_uuid, _l| {
            let db = db.clone();
            Box::pin(async move {
                if let Err(e) = sweep_expired(&db, ttl_hours).await {
                    tracing::error!("Failed to expire pending relays: {}", e);
                }
            })
        })?;

        self.scheduler.add(sweep_job).await?;
        self.scheduler.start().await?;

        log_system_event(
            "relay janitor started",
            Some(&format!("hourly, ttl {}h", self.ttl_hours)),
        );
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Runs one sweep immediately and returns how many bindings expired.
    pub async fn sweep_now(&self) -> Result<u64> {
        Ok(sweep_expired(&self.db, self.ttl_hours).await?)
    }
}

async fn sweep_expired(db: &DatabaseManager, ttl_hours: i64) -> Result<u64, sqlx::Error> {
    let cutoff = cutoff_rfc3339(ttl_hours);
    let removed = PendingRelay::delete_older_than(&db.pool, &cutoff).await?;

    if removed > 0 {
        tracing::info!("Expired {} pending relay(s) older than {}", removed, cutoff);
    }
    Ok(removed)
}
