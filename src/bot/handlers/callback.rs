use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::{remember_user, BotContext};
use crate::bot::commands::{distribute, events, events::Outcome, Actor};
use crate::bot::history;
use crate::bot::keyboards::{event_keyboard, parse_callback_data, EventAction};
use crate::database::models::*;

/// Telegram shows callback answers as a short toast.
const MAX_ANSWER_LEN: usize = 200;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    ctx: BotContext,
) -> ResponseResult<()> {
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat.id)
        .unwrap_or(ChatId(q.from.id.0 as i64));
    let actor = Actor::new(&q.from, chat_id);

    remember_user(&ctx.db.pool, &q.from).await;
    let parsed = q.data.as_deref().and_then(parse_callback_data);
    history::record_callback(&ctx.db.pool, &q, parsed.as_ref().map(|(_, event_id)| *event_id)).await;

    let Some((action, event_id)) = parsed else {
        tracing::warn!("Unrecognised callback data {:?} from user {}", q.data, actor.id);
        bot.answer_callback_query(q.id)
            .text("This button is no longer supported")
            .await?;
        return Ok(());
    };

    tracing::info!(
        "Callback received: {} on event {} from user {} ({}) in chat {}",
        action, event_id, actor.name, actor.id, chat_id.0
    );


    let outcome = match action {
        EventAction::Join => events::join(&ctx, &actor, event_id).await,
        EventAction::Leave => events::leave(&ctx, &actor, event_id).await,
        EventAction::Open => events::set_registration(&ctx, &actor, event_id, true).await,
        EventAction::Close => events::set_registration(&ctx, &actor, event_id, false).await,
        EventAction::Distribute => distribute::distribute(&bot, &ctx, &actor, event_id, None).await,
        EventAction::Select => events::select(&ctx, &actor, event_id).await,
        EventAction::Refresh => Outcome::Info("Updated".to_string()),
    };

    bot.answer_callback_query(q.id.clone())
        .text(truncate(outcome.text(), MAX_ANSWER_LEN))
        .show_alert(matches!(outcome, Outcome::Failure(_)))
        .await?;

    if let Some(message) = q.message.as_ref() {
        if let Err(e) = refresh_card(&bot, &ctx, message, event_id).await {
            tracing::debug!("Event card {} not refreshed: {}", event_id, e);
        }
    }

    Ok(())
}

/// Redraws the card the button belongs to.
async fn refresh_card(
    bot: &Bot,
    ctx: &BotContext,
    message: &Message,
    event_id: i64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = Event::find_by_id(&ctx.db.pool, event_id)
        .await?
        .ok_or("event no longer exists")?;
    let count = Event::participant_count(&ctx.db.pool, event_id).await?;

    // Telegram refuses edits that change nothing; that error is harmless.
    bot.edit_message_text(message.chat.id, message.id, events::render_event_card(&event, count))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(event_keyboard(&event))
        .await?;

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push('…');
    truncated
}
