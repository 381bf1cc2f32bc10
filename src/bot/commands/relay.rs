use teloxide::prelude::*;

use super::{report_failure, Actor};
use crate::bot::handlers::BotContext;
use crate::database::models::*;
use crate::services::relay::begin_relay;
use crate::utils::{
    feedback::CommandFeedback,
    logging::{log_command_start, log_command_success},
};

/// `/send_buddy`, `/send_santa` and `/send_nicholas`.
///
/// Arms the pending slot; the next message the user sends is relayed.
pub async fn handle_send(
    bot: Bot,
    msg: Message,
    actor: Actor,
    role: RelayRole,
    kind_hint: Option<EventKind>,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let command = match (role, kind_hint) {
        (RelayRole::ToBuddy, _) => "send_buddy",
        (RelayRole::ToSanta, Some(EventKind::SaintNicholas)) => "send_nicholas",
        (RelayRole::ToSanta, _) => "send_santa",
    };
    log_command_start(command, &actor.name, actor.id, msg.chat.id.0, None);
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone());

    if !msg.chat.is_private() {
        feedback
            .error("Anonymous messages only work in a private chat with the bot, otherwise everyone here would see who wrote them.")
            .await?;
        return Ok(());
    }

    match begin_relay(&ctx.db.pool, actor.id, role, kind_hint).await {
        Ok(event) => {
            let prompt = match role {
                RelayRole::ToBuddy => format!(
                    "Send me the message for the person you give a gift to in \"{}\". \
                     Text, photos, stickers and voice messages all work. /cancel to stop.",
                    event.name
                ),
                RelayRole::ToSanta => format!(
                    "Send me the message for your {} in \"{}\". \
                     Text, photos, stickers and voice messages all work. /cancel to stop.",
                    event.kind.giver_title(),
                    event.name
                ),
            };
            feedback.info(&prompt).await?;
            log_command_success(command, &actor.name, actor.id, msg.chat.id.0, Some(&format!("event {}", event.id)));
        }
        Err(e) => {
            report_failure(&feedback, command, &actor, &e).await?;
        }
    }

    Ok(())
}

/// `/cancel`. `had_pending` is whether the message handler just dropped a
/// pending slot.
pub async fn handle_cancel(
    bot: Bot,
    msg: Message,
    had_pending: bool,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot, msg.chat.id, ctx.db.pool.clone());

    if had_pending {
        feedback.success("Cancelled, nothing was sent").await?;
    } else {
        feedback.info("There was nothing to cancel").await?;
    }

    Ok(())
}
