//! Metadata log of the bot's traffic. Every send attempt to a private chat
//! also refreshes the user's `bot_can_message` flag.
//!
//! Logging is best-effort: failures are reported and never reach the user.

use sqlx::SqlitePool;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use teloxide::RequestError;

use crate::database::models::{LoggedMessage, MessageDirection, NewLoggedMessage, User};
use crate::utils::logging::log_database_error;

/// Content type label stored for a message, e.g. `text` or `photo`.
pub fn content_type(msg: &Message) -> &'static str {
    if msg.text().is_some() {
        "text"
    } else if msg.photo().is_some() {
        "photo"
    } else if msg.sticker().is_some() {
        "sticker"
    } else if msg.voice().is_some() {
        "voice"
    } else if msg.video_note().is_some() {
        "video_note"
    } else if msg.video().is_some() {
        "video"
    } else if msg.animation().is_some() {
        "animation"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.document().is_some() {
        "document"
    } else if msg.location().is_some() {
        "location"
    } else if msg.contact().is_some() {
        "contact"
    } else if msg.poll().is_some() {
        "poll"
    } else {
        "other"
    }
}

pub async fn record_inbound(pool: &SqlitePool, msg: &Message) {
    let Some(user) = msg.from() else {
        return;
    };

    store(
        pool,
        NewLoggedMessage {
            message_id: Some(i64::from(msg.id.0)),
            chat_id: msg.chat.id.0,
            user_id: Some(user.id.0 as i64),
            direction: MessageDirection::Inbound,
            content_type: content_type(msg).to_string(),
            event_id: None,
        },
    )
    .await;
}

/// Button presses have no chat message id of their own.
pub async fn record_callback(pool: &SqlitePool, q: &CallbackQuery, event_id: Option<i64>) {
    let user_id = q.from.id.0 as i64;

    store(
        pool,
        NewLoggedMessage {
            message_id: None,
            chat_id: q.message.as_ref().map(|m| m.chat.id.0).unwrap_or(user_id),
            user_id: Some(user_id),
            direction: MessageDirection::Inbound,
            content_type: "callback_query".to_string(),
            event_id,
        },
    )
    .await;
}

/// Logs the result of a send. Only API errors count as "bot cannot write
/// here"; network failures leave the flag alone.
pub async fn record_outbound(
    pool: &SqlitePool,
    chat_id: ChatId,
    sent: &ResponseResult<Message>,
    event_id: Option<i64>,
) {
    match sent {
        Ok(msg) => {
            store(pool, outbound(chat_id, msg.id, content_type(msg), event_id)).await;
            refresh_reachability(pool, chat_id, true).await;
        }
        Err(RequestError::Api(_)) => refresh_reachability(pool, chat_id, false).await,
        Err(_) => {}
    }
}

/// `copyMessage` returns only the id of the copy.
pub async fn record_copy(pool: &SqlitePool, chat_id: ChatId, copied: MessageId) {
    store(pool, outbound(chat_id, copied, "copy", None)).await;
}

fn outbound(
    chat_id: ChatId,
    message_id: MessageId,
    content_type: &str,
    event_id: Option<i64>,
) -> NewLoggedMessage {
    NewLoggedMessage {
        message_id: Some(i64::from(message_id.0)),
        chat_id: chat_id.0,
        user_id: chat_id.is_user().then_some(chat_id.0),
        direction: MessageDirection::Outbound,
        content_type: content_type.to_string(),
        event_id,
    }
}

async fn store(pool: &SqlitePool, entry: NewLoggedMessage) {
    if let Err(e) = LoggedMessage::record(pool, &entry).await {
        log_database_error("insert", "messages", &e.to_string(), Some(&format!("chat {}", entry.chat_id)));
    }
}

async fn refresh_reachability(pool: &SqlitePool, chat_id: ChatId, reachable: bool) {
    if !chat_id.is_user() {
        return;
    }
    if let Err(e) = User::set_bot_can_message(pool, chat_id.0, reachable).await {
        log_database_error("update", "users", &e.to_string(), Some(&format!("user {}", chat_id.0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_entries_name_the_private_chat_user() {
        let private = outbound(ChatId(42), MessageId(7), "text", None);
        assert_eq!(private.user_id, Some(42));
        assert_eq!(private.message_id, Some(7));
        assert_eq!(private.direction, MessageDirection::Outbound);

        let group = outbound(ChatId(-100123), MessageId(8), "copy", Some(3));
        assert_eq!(group.user_id, None);
        assert_eq!(group.event_id, Some(3));
    }
}
