use std::collections::HashMap;

use teloxide::prelude::*;

use super::{describe_failure, events::Outcome, Actor};
use crate::bot::handlers::BotContext;
use crate::bot::history;
use crate::database::{connection::DatabaseManager, models::*};
use crate::services::distribution::{distribute_event, DistributionOutcome};
use crate::utils::{
    feedback::{CommandFeedback, ProgressTracker},
    logging::{log_command_start, log_command_success, log_validation_error},
    validation::parse_event_id,
};

/// How many givers were told their recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub sent: usize,
    pub failed: usize,
}

pub async fn handle_distribute(
    bot: Bot,
    msg: Message,
    actor: Actor,
    raw_event_id: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    log_command_start("distribute", &actor.name, actor.id, msg.chat.id.0, Some(&raw_event_id));

    let event_id = match parse_event_id(&raw_event_id) {
        Ok(event_id) => event_id,
        Err(e) => {
            log_validation_error("distribute", "event_id", &raw_event_id, &e.to_string(), actor.id);
            CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone())
                .validation_error(&e.to_string(), "Usage: /distribute <event id>")
                .await?;
            return Ok(());
        }
    };

    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id, ctx.db.pool.clone());
    let mut progress = ProgressTracker::new(feedback, 2);
    progress.start("Drawing names...").await?;

    match distribute(&bot, ctx, &actor, event_id, Some(&mut progress)).await {
        Outcome::Success(text) => progress.complete(&text).await?,
        Outcome::Info(text) => progress.complete(&text).await?,
        Outcome::Failure(text) => progress.error(&text).await?,
    }

    Ok(())
}

/// Runs the distribution and notifies every giver. Used by both the command
/// and the "Draw names" button.
pub async fn distribute(
    bot: &Bot,
    ctx: &BotContext,
    actor: &Actor,
    event_id: i64,
    progress: Option<&mut ProgressTracker>,
) -> Outcome {
    let outcome = distribute_event(
        &ctx.db.pool,
        event_id,
        actor.id,
        &ctx.admin_ids,
        &ctx.pairing,
    )
    .await;

    match outcome {
        Ok(DistributionOutcome::Distributed { event, pairs, attempts }) => {
            log_command_success(
                "distribute",
                &actor.name,
                actor.id,
                actor.chat_id.0,
                Some(&format!("event {event_id}: {pairs} pairs after {attempts} pass(es)")),
            );

            if let Some(progress) = progress {
                if let Err(e) = progress.next_step("Names drawn, sending private messages...").await {
                    tracing::warn!("Could not update distribution progress: {}", e);
                }
            }

            match notify_assignments(bot, &ctx.db, &event).await {
                Ok(report) if report.failed == 0 => Outcome::Success(format!(
                    "Names for \"{}\" are drawn! All {} participants got their private message.",
                    event.name, report.sent
                )),
                Ok(report) => Outcome::Success(format!(
                    "Names for \"{}\" are drawn! {} of {} participants could not be messaged: \
                     they need to open a private chat with the bot and press Start, \
                     then use /event {} to see what to do.",
                    event.name,
                    report.failed,
                    report.sent + report.failed,
                    event.id
                )),
                Err(e) => Outcome::Success(format!(
                    "Names for \"{}\" are drawn, but sending the private messages failed ({}).",
                    event.name,
                    describe_failure("distribute", actor, &e)
                )),
            }
        }
        Ok(DistributionOutcome::AlreadyDistributed { event }) => Outcome::Info(format!(
            "Names for \"{}\" have already been drawn",
            event.name
        )),
        Err(e) => Outcome::Failure(describe_failure("distribute", actor, &e)),
    }
}

/// Tells each giver privately who they give a gift to.
pub async fn notify_assignments(
    bot: &Bot,
    db: &DatabaseManager,
    event: &Event,
) -> Result<NotifyReport, sqlx::Error> {
    let profiles = Participant::profiles_for_event(&db.pool, event.id).await?;
    let by_participant: HashMap<i64, &ParticipantProfile> =
        profiles.iter().map(|p| (p.participant_id, p)).collect();

    let mut report = NotifyReport::default();

    for giver in &profiles {
        let Some(recipient) = giver
            .recipient_id
            .and_then(|id| by_participant.get(&id))
        else {
            continue;
        };

        let text = assignment_message(event, &recipient.display_name());

        let chat_id = ChatId(giver.user_id);
        let sent = bot.send_message(chat_id, text).await;
        history::record_outbound(&db.pool, chat_id, &sent, Some(event.id)).await;

        match sent {
            Ok(_) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    "Could not notify participant {} of event {}: {}",
                    giver.participant_id,
                    event.id,
                    e
                );
            }
        }
    }

    Ok(report)
}

pub fn assignment_message(event: &Event, recipient_name: &str) -> String {
    format!(
        "{} Names for \"{}\" are drawn!\n\n\
         You are the {} of {}.\n\n\
         Send them an anonymous message with /send_buddy. \
         They can answer you with {} without learning who you are.",
        event.kind.emoji(),
        event.name,
        event.kind.giver_title(),
        recipient_name,
        event.kind.relay_command()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::datetime::now_rfc3339;

    #[test]
    fn test_assignment_message_mentions_recipient_and_commands() {
        let event = Event {
            id: 2,
            admin_id: 1,
            kind: EventKind::Santa,
            status: EventStatus::ParticipantsDistributed,
            name: "Office".to_string(),
            description: String::new(),
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
        };

        let text = assignment_message(&event, "@rudolph");
        assert!(text.contains("Secret Santa of @rudolph"));
        assert!(text.contains("/send_buddy"));
        assert!(text.contains("/send_santa"));
    }
}
