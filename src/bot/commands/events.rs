use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::{describe_failure, report_failure, Actor};
use crate::bot::handlers::BotContext;
use crate::bot::history;
use crate::bot::keyboards::event_keyboard;
use crate::database::models::*;
use crate::services::registration::{self, JoinOutcome, RegistrationChange};
use crate::utils::{
    datetime::format_timestamp,
    feedback::CommandFeedback,
    logging::{log_command_start, log_command_success, log_validation_error},
    markdown::{bold, escape_markdown},
    validation::{parse_event_id, parse_new_event, parse_start_payload},
};

/// Result of an event action, shared by commands and keyboard callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Info(String),
    Failure(String),
}

impl Outcome {
    pub fn text(&self) -> &str {
        match self {
            Outcome::Success(text) | Outcome::Info(text) | Outcome::Failure(text) => text.as_str(),
        }
    }

    pub async fn send(&self, feedback: &CommandFeedback) -> ResponseResult<()> {
        match self {
            Outcome::Success(text) => feedback.success(text).await?,
            Outcome::Info(text) => feedback.info(text).await?,
            Outcome::Failure(text) => feedback.error(text).await?,
        };
        Ok(())
    }
}

/// MarkdownV2 card describing an event. Contains nothing about pairings.
pub fn render_event_card(event: &Event, participant_count: i64) -> String {
    let mut card = format!(
        "{} {} \\#{}\n",
        event.kind.emoji(),
        bold(&escape_markdown(&event.name)),
        event.id
    );

    if !event.description.is_empty() {
        card.push('\n');
        card.push_str(&escape_markdown(&event.description));
        card.push('\n');
    }

    card.push_str(&format!(
        "\n{} {}\n{} {}\n{} {}\n{} {}\n",
        bold("Type:"),
        escape_markdown(event.kind.giver_title()),
        bold("Status:"),
        escape_markdown(event.status.label()),
        bold("Participants:"),
        participant_count,
        bold("Created:"),
        escape_markdown(&format_timestamp(&event.created_at)),
    ));

    let footer = match event.status {
        EventStatus::RegisterOpen => format!("Join with /join {}", event.id),
        EventStatus::RegisterClosed => "Registration is closed, names will be drawn soon".to_string(),
        EventStatus::ParticipantsDistributed => format!(
            "Names are drawn! Write with /send_buddy or {}",
            event.kind.relay_command()
        ),
    };
    card.push('\n');
    card.push_str(&escape_markdown(&footer));

    card
}

/// Sends the card with its keyboard to `chat_id`.
pub async fn send_event_card(
    bot: &Bot,
    ctx: &BotContext,
    chat_id: ChatId,
    event: &Event,
) -> ResponseResult<()> {
    let count = Event::participant_count(&ctx.db.pool, event.id)
        .await
        .unwrap_or_default();

    let sent = bot
        .send_message(chat_id, render_event_card(event, count))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(event_keyboard(event))
        .await;
    history::record_outbound(&ctx.db.pool, chat_id, &sent, Some(event.id)).await;
    sent?;
    Ok(())
}

pub async fn join(ctx: &BotContext, actor: &Actor, event_id: i64) -> Outcome {
    match registration::join_event(&ctx.db.pool, actor.id, event_id).await {
        Ok(JoinOutcome::Joined { event, .. }) => {
            log_command_success("join", &actor.name, actor.id, actor.chat_id.0, Some(&format!("event {event_id}")));
            Outcome::Success(format!(
                "You joined \"{}\"! You will get a private message once names are drawn.",
                event.name
            ))
        }
        Ok(JoinOutcome::AlreadyJoined { event, .. }) => {
            Outcome::Info(format!("You are already taking part in \"{}\"", event.name))
        }
        Err(e) => Outcome::Failure(describe_failure("join", actor, &e)),
    }
}

pub async fn leave(ctx: &BotContext, actor: &Actor, event_id: i64) -> Outcome {
    match registration::leave_event(&ctx.db.pool, actor.id, event_id).await {
        Ok(event) => {
            log_command_success("leave", &actor.name, actor.id, actor.chat_id.0, Some(&format!("event {event_id}")));
            Outcome::Success(format!("You left \"{}\"", event.name))
        }
        Err(e) => Outcome::Failure(describe_failure("leave", actor, &e)),
    }
}

pub async fn set_registration(ctx: &BotContext, actor: &Actor, event_id: i64, open: bool) -> Outcome {
    let command = if open { "open" } else { "close" };

    match registration::set_registration(&ctx.db.pool, actor.id, &ctx.admin_ids, event_id, open).await {
        Ok(RegistrationChange::Changed(event)) => {
            log_command_success(command, &actor.name, actor.id, actor.chat_id.0, Some(&format!("event {event_id}")));
            if open {
                Outcome::Success(format!("Registration for \"{}\" is open again", event.name))
            } else {
                Outcome::Success(format!(
                    "Registration for \"{}\" is closed. Use /distribute {} to draw names.",
                    event.name, event.id
                ))
            }
        }
        Ok(RegistrationChange::Unchanged(event)) => Outcome::Info(format!(
            "\"{}\": {}",
            event.name,
            event.status.label()
        )),
        Err(e) => Outcome::Failure(describe_failure(command, actor, &e)),
    }
}

pub async fn select(ctx: &BotContext, actor: &Actor, event_id: i64) -> Outcome {
    match registration::select_event(&ctx.db.pool, actor.id, event_id).await {
        Ok((event, _)) => Outcome::Success(format!(
            "Your messages now go to people in \"{}\"",
            event.name
        )),
        Err(e) => Outcome::Failure(describe_failure("select", actor, &e)),
    }
}

pub async fn handle_start(
    bot: Bot,
    msg: Message,
    actor: Actor,
    payload: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone());

    match parse_start_payload(&payload) {
        Ok(None) => {
            let sent = bot.send_message(
                msg.chat.id,
                "🎅 Welcome to the Secret Santa Bot!\n\n\
                 Create an event with /newevent, share the invitation link, \
                 and once everyone joined the admin draws names.\n\
                 You can then talk to the person you give a gift to with /send_buddy, \
                 and they can answer with /send_santa, all anonymously.\n\n\
                 Use /help to see all commands.",
            )
            .await;
            history::record_outbound(&ctx.db.pool, msg.chat.id, &sent, None).await;
            sent?;
        }
        Ok(Some(event_id)) => {
            log_command_start("start", &actor.name, actor.id, msg.chat.id.0, Some(&format!("invitation to event {event_id}")));
            let outcome = join(ctx, &actor, event_id).await;
            outcome.send(&feedback).await?;

            if !matches!(outcome, Outcome::Failure(_)) {
                if let Ok(Some(event)) = Event::find_by_id(&ctx.db.pool, event_id).await {
                    send_event_card(&bot, ctx, msg.chat.id, &event).await?;
                }
            }
        }
        Err(e) => {
            log_validation_error("start", "payload", &payload, &e.to_string(), actor.id);
            feedback
                .validation_error(&e.to_string(), "Ask the organiser for a fresh invitation link")
                .await?;
        }
    }

    Ok(())
}

pub async fn handle_new_event(
    bot: Bot,
    msg: Message,
    actor: Actor,
    args: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    log_command_start("newevent", &actor.name, actor.id, msg.chat.id.0, None);
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone());

    let new_event = match parse_new_event(&args) {
        Ok(new_event) => new_event,
        Err(e) => {
            log_validation_error("newevent", "args", &args, &e.to_string(), actor.id);
            feedback
                .validation_error(
                    &e.to_string(),
                    "Example: /newevent santa Office Party | Budget 20 EUR, gifts on Dec 20",
                )
                .await?;
            return Ok(());
        }
    };

    let (event, _) = match registration::create_event(&ctx.db.pool, actor.id, new_event).await {
        Ok(created) => created,
        Err(e) => {
            report_failure(&feedback, "newevent", &actor, &e).await?;
            return Ok(());
        }
    };

    log_command_success("newevent", &actor.name, actor.id, msg.chat.id.0, Some(&format!("event {}", event.id)));
    send_event_card(&bot, ctx, msg.chat.id, &event).await?;

    let invitation = match bot.get_me().await {
        Ok(me) => match me.user.username {
            Some(username) => format!(
                "Share this link to invite people: https://t.me/{username}?start=event_{}",
                event.id
            ),
            None => format!("Invite people with /join {}", event.id),
        },
        Err(e) => {
            tracing::warn!("Could not look up the bot username: {}", e);
            format!("Invite people with /join {}", event.id)
        }
    };
    feedback.info(&invitation).await?;

    Ok(())
}

/// Shared shape of the commands that take one event id.
pub async fn handle_event_command(
    bot: Bot,
    msg: Message,
    actor: Actor,
    command: &str,
    raw_event_id: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    log_command_start(command, &actor.name, actor.id, msg.chat.id.0, Some(&raw_event_id));
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone());

    let event_id = match parse_event_id(&raw_event_id) {
        Ok(event_id) => event_id,
        Err(e) => {
            log_validation_error(command, "event_id", &raw_event_id, &e.to_string(), actor.id);
            feedback
                .validation_error(&e.to_string(), &format!("Usage: /{command} <event id>, see /events"))
                .await?;
            return Ok(());
        }
    };

    let outcome = match command {
        "join" => join(ctx, &actor, event_id).await,
        "leave" => leave(ctx, &actor, event_id).await,
        "open" => set_registration(ctx, &actor, event_id, true).await,
        "close" => set_registration(ctx, &actor, event_id, false).await,
        "select" => select(ctx, &actor, event_id).await,
        "event" => {
            return match Event::find_by_id(&ctx.db.pool, event_id).await {
                Ok(Some(event)) => send_event_card(&bot, ctx, msg.chat.id, &event).await,
                Ok(None) => {
                    feedback.error(&format!("Event #{event_id} was not found")).await?;
                    Ok(())
                }
                Err(e) => {
                    report_failure(&feedback, command, &actor, &e).await?;
                    Ok(())
                }
            };
        }
        other => {
            tracing::warn!("No event action for command {}", other);
            return Ok(());
        }
    };

    outcome.send(&feedback).await
}

pub async fn handle_events(
    bot: Bot,
    msg: Message,
    actor: Actor,
    ctx: &BotContext,
) -> ResponseResult<()> {
    log_command_start("events", &actor.name, actor.id, msg.chat.id.0, None);
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone());

    let events = match registration::list_user_events(&ctx.db.pool, actor.id).await {
        Ok(events) => events,
        Err(e) => {
            report_failure(&feedback, "events", &actor, &e).await?;
            return Ok(());
        }
    };

    if events.is_empty() {
        feedback
            .info("You are not part of any event yet. Create one with /newevent or ask for an invitation link.")
            .await?;
        return Ok(());
    }

    let active = registration::resolve_active_participant(&ctx.db.pool, actor.id)
        .await
        .ok()
        .flatten()
        .map(|participant| participant.id);

    let mut text = String::from("Your events:\n");
    for (event, participant) in &events {
        let mut markers = Vec::new();
        if event.admin_id == actor.id {
            markers.push("admin");
        }
        if active == Some(participant.id) {
            markers.push("messages go here");
        }

        text.push_str(&format!(
            "\n{} #{} {}: {}",
            event.kind.emoji(),
            event.id,
            event.name,
            event.status.label()
        ));
        if !markers.is_empty() {
            text.push_str(&format!(" ({})", markers.join(", ")));
        }
    }
    text.push_str("\n\nOpen a card with /event <id>");

    feedback.info(&text).await?;
    log_command_success("events", &actor.name, actor.id, msg.chat.id.0, Some(&format!("{} events", events.len())));
    Ok(())
}
