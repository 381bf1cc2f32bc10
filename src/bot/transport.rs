use std::future::Future;

use sqlx::SqlitePool;
use teloxide::prelude::*;
use teloxide::types::MessageId;

use crate::bot::history::{record_copy, record_outbound};
use crate::services::relay::{DeliveryError, RelayPayload, RelayTransport};

/// Relays through the Bot API.
///
/// `copyMessage` produces a copy without the "forwarded from" header, so the
/// receiver never sees who wrote it. The label is sent as a reply to the copy.
/// Both are added to the message log.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    pool: SqlitePool,
}

impl TelegramTransport {
    pub fn new(bot: Bot, pool: SqlitePool) -> Self {
        Self { bot, pool }
    }
}

impl RelayTransport for TelegramTransport {
    fn deliver(
        &self,
        recipient_chat: i64,
        payload: RelayPayload,
        label: String,
    ) -> impl Future<Output = Result<i64, DeliveryError>> + Send + '_ {
        async move {
            let recipient = ChatId(recipient_chat);

            let copied = self
                .bot
                .copy_message(recipient, ChatId(payload.from_chat), MessageId(payload.message_id))
                .await
                .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;

            record_copy(&self.pool, recipient, copied).await;

            // The copy already arrived; a missing label is not a failed relay.
            let labelled = self
                .bot
                .send_message(recipient, label)
                .reply_to_message_id(copied)
                .await;
            if let Err(e) = &labelled {
                tracing::warn!("Relay label for chat {} was not delivered: {}", recipient_chat, e);
            }
            record_outbound(&self.pool, recipient, &labelled, None).await;

            Ok(i64::from(copied.0))
        }
    }
}
