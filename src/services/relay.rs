//! Anonymous message relay between paired participants.
//!
//! A relay goes through two steps per sender. A send command binds a
//! [`PendingRelay`] slot, and the next plain message of that sender consumes
//! the slot and is copied to the other side of the pairing. An audit
//! [`ForwardMessage`] is written only after the transport confirmed delivery.

use std::future::Future;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::database::models::*;
use crate::services::registration::resolve_active_participant;
use crate::utils::logging::log_relay_event;

/// A user-authored message that should be copied to another chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPayload {
    pub from_chat: i64,
    pub message_id: i32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("recipient cannot be reached: {0}")]
    Unreachable(String),
}

/// Outbound side of the relay.
///
/// Implementations must not attach anything identifying the sender; the
/// only context the receiver gets is `label`.
pub trait RelayTransport: Send + Sync {
    /// Delivers `payload` to `recipient_chat` and returns the transport id of
    /// the delivered copy.
    fn deliver(
        &self,
        recipient_chat: i64,
        payload: RelayPayload,
        label: String,
    ) -> impl Future<Output = Result<i64, DeliveryError>> + Send + '_;
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("you have no active event, pick one with /select <event id>")]
    NoActiveEvent,

    #[error("event #{0} was not found")]
    EventNotFound(i64),

    #[error("participants of this event are not distributed yet")]
    NotActive,

    #[error("this event uses {expected} for that")]
    WrongCommand { expected: &'static str },

    #[error("there is nobody to send this to")]
    NoRecipient,

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Who receives a message sent by `sender` in `role`.
///
/// `ToBuddy` follows the stored assignment. `ToSanta` asks who holds `sender`
/// as recipient.
pub async fn resolve_recipient(
    pool: &SqlitePool,
    sender: &Participant,
    role: RelayRole,
) -> Result<Participant, RelayError> {
    let recipient = match role {
        RelayRole::ToBuddy => sender.recipient(pool).await?,
        RelayRole::ToSanta => sender.santa(pool).await?,
    };

    recipient.ok_or(RelayError::NoRecipient)
}

/// Validates a send command and arms the user's pending slot.
///
/// `kind_hint` is the event kind implied by the command (`/send_santa` or
/// `/send_nicholas`); `None` accepts any kind.
pub async fn begin_relay(
    pool: &SqlitePool,
    user_id: i64,
    role: RelayRole,
    kind_hint: Option<EventKind>,
) -> Result<Event, RelayError> {
    let sender = resolve_active_participant(pool, user_id)
        .await?
        .ok_or(RelayError::NoActiveEvent)?;

    let event = load_event(pool, sender.event_id).await?;

    if let Some(kind) = kind_hint {
        if kind != event.kind {
            return Err(RelayError::WrongCommand {
                expected: event.kind.relay_command(),
            });
        }
    }

    if !event.status.is_distributed() {
        return Err(RelayError::NotActive);
    }

    resolve_recipient(pool, &sender, role).await?;
    PendingRelay::bind(pool, user_id, sender.id, role).await?;

    log_relay_event("awaiting payload", event.id, sender.id, Some(role.tag()));
    Ok(event)
}

/// Copies `payload` from `sender` to the participant on the other side of
/// `role` and records the delivery.
pub async fn relay<T: RelayTransport>(
    pool: &SqlitePool,
    transport: &T,
    sender: &Participant,
    role: RelayRole,
    payload: RelayPayload,
) -> Result<ForwardMessage, RelayError> {
    let event = load_event(pool, sender.event_id).await?;
    if !event.status.is_distributed() {
        return Err(RelayError::NotActive);
    }

    let recipient = resolve_recipient(pool, sender, role).await?;
    let label = relay_label(&event, role);

    let message_id = match transport.deliver(recipient.user_id, payload, label).await {
        Ok(message_id) => message_id,
        Err(e) => {
            log_relay_event("delivery failed", event.id, sender.id, Some(&e.to_string()));
            if let Err(db_err) = User::set_bot_can_message(pool, recipient.user_id, false).await {
                tracing::warn!("Could not flag user {} as unreachable: {}", recipient.user_id, db_err);
            }
            return Err(RelayError::Delivery(e));
        }
    };

    // The copy has arrived: the audit record must exist even if the flag update fails.
    let record = ForwardMessage::create(pool, message_id, role, sender.id, recipient.id).await?;
    if let Err(db_err) = User::set_bot_can_message(pool, recipient.user_id, true).await {
        tracing::warn!("Could not flag user {} as reachable: {}", recipient.user_id, db_err);
    }

    log_relay_event("delivered", event.id, sender.id, Some(role.tag()));
    Ok(record)
}

/// Consumes the user's pending slot, if any, and relays `payload` with it.
///
/// The slot is gone afterwards whether the relay succeeded or not. Returns
/// `Ok(None)` when nothing was pending.
pub async fn capture_pending<T: RelayTransport>(
    pool: &SqlitePool,
    transport: &T,
    user_id: i64,
    payload: RelayPayload,
) -> Result<Option<ForwardMessage>, RelayError> {
    let Some(pending) = PendingRelay::take(pool, user_id).await? else {
        return Ok(None);
    };

    let sender = Participant::find_by_id(pool, pending.participant_id)
        .await?
        .ok_or(RelayError::NoActiveEvent)?;

    relay(pool, transport, &sender, pending.role, payload)
        .await
        .map(Some)
}

/// Header shown to the receiver above a relayed message. Names the event and
/// the direction, never the sender.
pub fn relay_label(event: &Event, role: RelayRole) -> String {
    match role {
        RelayRole::ToBuddy => format!(
            "{} Message from your {} ({})",
            event.kind.emoji(),
            event.kind.giver_title(),
            event.name
        ),
        RelayRole::ToSanta => format!(
            "💌 Message from the person you are giving a gift to ({})",
            event.name
        ),
    }
}

async fn load_event(pool: &SqlitePool, event_id: i64) -> Result<Event, RelayError> {
    Event::find_by_id(pool, event_id)
        .await?
        .ok_or(RelayError::EventNotFound(event_id))
}
