use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::{remember_user, BotContext};
use crate::bot::commands::{distribute, events, relay, Actor, Command};
use crate::bot::history;
use crate::database::models::*;
use crate::utils::logging::log_database_error;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: BotContext,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let actor = Actor::new(user, msg.chat.id);

    remember_user(&ctx.db.pool, user).await;
    history::record_inbound(&ctx.db.pool, &msg).await;

    // Any command ends a pending relay, except the ones that arm a new one.
    let had_pending = if cmd.starts_relay() {
        false
    } else {
        match PendingRelay::clear(&ctx.db.pool, actor.id).await {
            Ok(cleared) => cleared,
            Err(e) => {
                log_database_error("clear", "pending_relays", &e.to_string(), None);
                false
            }
        }
    };
    if had_pending {
        tracing::info!("Pending relay of user {} dropped by /{}", actor.id, cmd.name());
    }

    match cmd {
        Command::Help => {
            let sent = bot.send_message(msg.chat.id, Command::descriptions().to_string()).await;
            history::record_outbound(&ctx.db.pool, msg.chat.id, &sent, None).await;
            sent?;
        }
        Command::Start { payload } => {
            events::handle_start(bot, msg, actor, payload, &ctx).await?;
        }
        Command::NewEvent { args } => {
            events::handle_new_event(bot, msg, actor, args, &ctx).await?;
        }
        Command::Events => {
            events::handle_events(bot, msg, actor, &ctx).await?;
        }
        Command::Join { event_id } => {
            events::handle_event_command(bot, msg, actor, "join", event_id, &ctx).await?;
        }
        Command::Leave { event_id } => {
            events::handle_event_command(bot, msg, actor, "leave", event_id, &ctx).await?;
        }
        Command::Event { event_id } => {
            events::handle_event_command(bot, msg, actor, "event", event_id, &ctx).await?;
        }
        Command::Select { event_id } => {
            events::handle_event_command(bot, msg, actor, "select", event_id, &ctx).await?;
        }
        Command::Open { event_id } => {
            events::handle_event_command(bot, msg, actor, "open", event_id, &ctx).await?;
        }
        Command::Close { event_id } => {
            events::handle_event_command(bot, msg, actor, "close", event_id, &ctx).await?;
        }
        Command::Distribute { event_id } => {
            distribute::handle_distribute(bot, msg, actor, event_id, &ctx).await?;
        }
        Command::SendBuddy => {
            relay::handle_send(bot, msg, actor, RelayRole::ToBuddy, None, &ctx).await?;
        }
        Command::SendSanta => {
            relay::handle_send(bot, msg, actor, RelayRole::ToSanta, Some(EventKind::Santa), &ctx).await?;
        }
        Command::SendNicholas => {
            relay::handle_send(bot, msg, actor, RelayRole::ToSanta, Some(EventKind::SaintNicholas), &ctx).await?;
        }
        Command::Cancel => {
            relay::handle_cancel(bot, msg, had_pending, &ctx).await?;
        }
    }
    Ok(())
}
