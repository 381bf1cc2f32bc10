//! Turning a closed event into a distributed one.
//!
//! The status update `RegisterClosed -> ParticipantsDistributed` is the first
//! statement of the transaction. SQLite serialises writers, so of two
//! concurrent triggers only one sees the update take effect; the other finds
//! the event already distributed and reports a no-op. Participants, pairing
//! and assignments are then read and written inside that same transaction,
//! so no reader ever observes a partial assignment set.

use std::collections::HashMap;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::database::models::*;
use crate::pairing::{distribute, PairingError, PairingSettings};
use crate::utils::logging::log_pairing_event;

/// How many times a run is retried from scratch after a store failure.
pub const MAX_STORE_RETRIES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionOutcome {
    Distributed { event: Event, pairs: usize, attempts: u32 },
    /// Someone else distributed the event first. Nothing was written.
    AlreadyDistributed { event: Event },
}

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("event #{0} was not found")]
    EventNotFound(i64),

    #[error("only the event admin can distribute participants")]
    NotAdmin,

    #[error("close registration before distributing participants")]
    RegistrationOpen,

    #[error("at least 2 participants are needed, this event has {count}")]
    TooFewParticipants { count: usize },

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Distributes `event_id` on behalf of `actor_id`.
///
/// Store failures roll the whole run back and start over with fresh
/// randomness, at most [`MAX_STORE_RETRIES`] times.
pub async fn distribute_event(
    pool: &SqlitePool,
    event_id: i64,
    actor_id: i64,
    global_admins: &[i64],
    settings: &PairingSettings,
) -> Result<DistributionOutcome, DistributionError> {
    let event = Event::find_by_id(pool, event_id)
        .await?
        .ok_or(DistributionError::EventNotFound(event_id))?;

    if !event.is_managed_by(actor_id, global_admins) {
        return Err(DistributionError::NotAdmin);
    }

    let mut retries = 0;
    loop {
        match try_distribute(pool, &event, settings).await {
            Err(DistributionError::Database(e)) if retries < MAX_STORE_RETRIES => {
                retries += 1;
                tracing::warn!(
                    "Distribution of event {} failed on the store ({}), retry {}/{}",
                    event_id,
                    e,
                    retries,
                    MAX_STORE_RETRIES
                );
            }
            result => return result,
        }
    }
}

async fn try_distribute(
    pool: &SqlitePool,
    event: &Event,
    settings: &PairingSettings,
) -> Result<DistributionOutcome, DistributionError> {
    let mut tx = pool.begin().await?;

    let claimed = Event::transition(
        &mut *tx,
        event.id,
        EventStatus::RegisterClosed,
        EventStatus::ParticipantsDistributed,
    )
    .await?;

    if !claimed {
        drop(tx);
        let current = Event::find_by_id(pool, event.id)
            .await?
            .ok_or(DistributionError::EventNotFound(event.id))?;

        return match current.status {
            EventStatus::ParticipantsDistributed => {
                tracing::info!("Event {} is already distributed, nothing to do", event.id);
                Ok(DistributionOutcome::AlreadyDistributed { event: current })
            }
            _ => Err(DistributionError::RegistrationOpen),
        };
    }

    let participant_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM participants WHERE event_id = ? ORDER BY id")
            .bind(event.id)
            .fetch_all(&mut *tx)
            .await?;

    if participant_ids.len() < 2 {
        // Dropping the transaction rolls the status claim back.
        return Err(DistributionError::TooFewParticipants {
            count: participant_ids.len(),
        });
    }

    sqlx::query("UPDATE participants SET recipient_id = NULL WHERE event_id = ?")
        .bind(event.id)
        .execute(&mut *tx)
        .await?;

    let pairing = {
        let mut rng = rand::thread_rng();
        distribute(&participant_ids, &mut rng, settings)?
    };
    let attempts = pairing.attempts();
    let assignments: HashMap<i64, i64> = pairing.into_assignments();

    for (giver, recipient) in &assignments {
        sqlx::query("UPDATE participants SET recipient_id = ? WHERE id = ?")
            .bind(recipient)
            .bind(giver)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    log_pairing_event(
        "assignments stored",
        &format!("event {}, {} pairs", event.id, assignments.len()),
    );

    let mut distributed = event.clone();
    distributed.status = EventStatus::ParticipantsDistributed;

    Ok(DistributionOutcome::Distributed {
        event: distributed,
        pairs: assignments.len(),
        attempts,
    })
}

/// The stored assignment of an event as `giver -> recipient` participant ids.
pub async fn load_assignments(
    pool: &SqlitePool,
    event_id: i64,
) -> Result<HashMap<i64, i64>, sqlx::Error> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT id, recipient_id FROM participants WHERE event_id = ? AND recipient_id IS NOT NULL",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
