//! Event creation and membership.
//!
//! Every write that depends on the event status is guarded by that status in
//! the same SQL statement, so joins, leaves and registration toggles cannot
//! race a distribution into an inconsistent state.

use sqlx::SqlitePool;
use thiserror::Error;

use crate::database::models::*;
use crate::utils::validation::NewEventArgs;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("event #{0} was not found")]
    EventNotFound(i64),

    #[error("registration for this event is closed")]
    RegistrationClosed,

    #[error("you are not registered for this event")]
    NotParticipant,

    #[error("participants of this event are already distributed")]
    AlreadyDistributed,

    #[error("only the event admin can do that")]
    NotAdmin,

    #[error("the event admin cannot leave their own event")]
    AdminCannotLeave,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Joined { event: Event, participant: Participant },
    AlreadyJoined { event: Event, participant: Participant },
}

#[derive(Debug, Clone)]
pub enum RegistrationChange {
    Changed(Event),
    Unchanged(Event),
}

/// Creates an event and registers its admin as the first participant.
pub async fn create_event(
    pool: &SqlitePool,
    admin_id: i64,
    args: NewEventArgs,
) -> Result<(Event, Participant), RegistrationError> {
    let mut tx = pool.begin().await?;

    let event = Event::create(&mut *tx, admin_id, args.kind, args.name, args.description).await?;
    let participant = Participant::create(&mut *tx, event.id, admin_id).await?;
    User::set_active_participant(&mut *tx, admin_id, Some(participant.id)).await?;

    tx.commit().await?;

    tracing::info!(
        "Created event {} ({:?}) with admin {}",
        event.id,
        event.kind,
        admin_id
    );
    Ok((event, participant))
}

pub async fn join_event(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
) -> Result<JoinOutcome, RegistrationError> {
    let event = load_event(pool, event_id).await?;

    if let Some(participant) = Participant::find_by_event_and_user(pool, event_id, user_id).await? {
        return Ok(JoinOutcome::AlreadyJoined { event, participant });
    }

    let participant = match Participant::create_if_open(pool, event_id, user_id).await? {
        Some(participant) => participant,
        None => {
            let event = load_event(pool, event_id).await?;
            return Err(match event.status {
                EventStatus::ParticipantsDistributed => RegistrationError::AlreadyDistributed,
                _ => RegistrationError::RegistrationClosed,
            });
        }
    };

    User::set_active_participant(pool, user_id, Some(participant.id)).await?;

    tracing::info!("User {} joined event {} as participant {}", user_id, event_id, participant.id);
    Ok(JoinOutcome::Joined { event, participant })
}

pub async fn leave_event(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
) -> Result<Event, RegistrationError> {
    let event = load_event(pool, event_id).await?;

    if event.admin_id == user_id {
        return Err(RegistrationError::AdminCannotLeave);
    }

    if Participant::find_by_event_and_user(pool, event_id, user_id).await?.is_none() {
        return Err(RegistrationError::NotParticipant);
    }

    if !Participant::delete_before_distribution(pool, event_id, user_id).await? {
        // The membership existed a moment ago, so the status guard refused.
        return Err(RegistrationError::AlreadyDistributed);
    }

    tracing::info!("User {} left event {}", user_id, event_id);
    Ok(event)
}

/// Opens or closes registration. Distributed events cannot be reopened.
pub async fn set_registration(
    pool: &SqlitePool,
    actor_id: i64,
    global_admins: &[i64],
    event_id: i64,
    open: bool,
) -> Result<RegistrationChange, RegistrationError> {
    let event = load_event(pool, event_id).await?;
    if !event.is_managed_by(actor_id, global_admins) {
        return Err(RegistrationError::NotAdmin);
    }

    let (from, to) = if open {
        (EventStatus::RegisterClosed, EventStatus::RegisterOpen)
    } else {
        (EventStatus::RegisterOpen, EventStatus::RegisterClosed)
    };

    let changed = Event::transition(pool, event_id, from, to).await?;
    let event = load_event(pool, event_id).await?;

    if changed {
        tracing::info!("Event {} moved to {:?} by {}", event_id, to, actor_id);
        return Ok(RegistrationChange::Changed(event));
    }

    match event.status {
        status if status == to => Ok(RegistrationChange::Unchanged(event)),
        EventStatus::ParticipantsDistributed => Err(RegistrationError::AlreadyDistributed),
        _ => Ok(RegistrationChange::Unchanged(event)),
    }
}

/// Makes `event_id` the event relay commands act on for this user.
pub async fn select_event(
    pool: &SqlitePool,
    user_id: i64,
    event_id: i64,
) -> Result<(Event, Participant), RegistrationError> {
    let event = load_event(pool, event_id).await?;
    let participant = Participant::find_by_event_and_user(pool, event_id, user_id)
        .await?
        .ok_or(RegistrationError::NotParticipant)?;

    User::set_active_participant(pool, user_id, Some(participant.id)).await?;
    Ok((event, participant))
}

/// The participation relay commands use: the selected one if it still
/// exists, otherwise the user's only participation.
pub async fn resolve_active_participant(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<Participant>, sqlx::Error> {
    if let Some(user) = User::find_by_id(pool, user_id).await? {
        if let Some(participant_id) = user.active_participant_id {
            if let Some(participant) = Participant::find_by_id(pool, participant_id).await? {
                return Ok(Some(participant));
            }
        }
    }

    let mut participations = Participant::find_by_user(pool, user_id).await?;
    if participations.len() == 1 {
        return Ok(participations.pop());
    }

    Ok(None)
}

/// Events the user takes part in, paired with their membership.
pub async fn list_user_events(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<(Event, Participant)>, sqlx::Error> {
    let participations = Participant::find_by_user(pool, user_id).await?;
    let event_ids: Vec<i64> = participations.iter().map(|p| p.event_id).collect();
    let events = Event::find_by_ids(pool, &event_ids).await?;

    Ok(events
        .into_iter()
        .filter_map(|event| {
            participations
                .iter()
                .find(|p| p.event_id == event.id)
                .cloned()
                .map(|participant| (event, participant))
        })
        .collect())
}

async fn load_event(pool: &SqlitePool, event_id: i64) -> Result<Event, RegistrationError> {
    Event::find_by_id(pool, event_id)
        .await?
        .ok_or(RegistrationError::EventNotFound(event_id))
}
