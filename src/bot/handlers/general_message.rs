use teloxide::prelude::*;

use super::{remember_user, BotContext};
use crate::bot::commands::{describe_failure, Actor};
use crate::bot::history;
use crate::bot::transport::TelegramTransport;
use crate::database::models::PendingRelay;
use crate::services::relay::{capture_pending, RelayPayload};
use crate::utils::{feedback::CommandFeedback, logging::log_database_error};

pub async fn handle_general_message(
    bot: Bot,
    msg: Message,
    ctx: BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone());
    let Some(actor) = Actor::from_message(&msg) else {
        return Ok(());
    };
    if let Some(user) = msg.from() {
        remember_user(&ctx.db.pool, user).await;
    }
    history::record_inbound(&ctx.db.pool, &msg).await;

    if let Some(text) = msg.text().filter(|text| text.starts_with('/')) {
        // Unparsed commands end a pending relay like any other command.
        if let Err(e) = PendingRelay::clear(&ctx.db.pool, actor.id).await {
            log_database_error("clear", "pending_relays", &e.to_string(), None);
        }

        let error_msg = format!("Unknown command: {}", text.split_whitespace().next().unwrap_or(text));
        let suggestion = "Use /help to see all available commands, or check your command syntax.";
        feedback.validation_error(&error_msg, suggestion).await?;
        return Ok(());
    }

    if msg.chat.is_private() {
        let payload = RelayPayload {
            from_chat: msg.chat.id.0,
            message_id: msg.id.0,
        };
        let transport = TelegramTransport::new(bot.clone(), ctx.db.pool.clone());

        match capture_pending(&ctx.db.pool, &transport, actor.id, payload).await {
            Ok(Some(_)) => {
                feedback.success("Delivered! Your identity stays secret.").await?;
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => {
                let reason = describe_failure("relay", &actor, &e);
                feedback
                    .validation_error(
                        &format!("Your message was not delivered: {reason}"),
                        "Use the send command again to try once more.",
                    )
                    .await?;
                return Ok(());
            }
        }
    }

    // Plain chatter in groups is none of our business.
    if msg.chat.is_private() && msg.text().is_some() {
        feedback
            .info("To write to the person you give a gift to, use /send_buddy first. To answer your Secret Santa, use /send_santa (or /send_nicholas).")
            .await?;
    }

    Ok(())
}
