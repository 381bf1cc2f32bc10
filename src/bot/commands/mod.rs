pub mod distribute;
pub mod events;
pub mod relay;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::services::{
    distribution::DistributionError, registration::RegistrationError, relay::RelayError,
};
use crate::utils::{feedback::CommandFeedback, logging::log_command_error, logging::log_database_error};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Secret Santa Bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot or accept an invitation")]
    Start { payload: String },
    #[command(description = "Create an event: /newevent <santa|nicholas> <name> | <description>")]
    NewEvent { args: String },
    #[command(description = "Join an event: /join <event id>")]
    Join { event_id: String },
    #[command(description = "Leave an event before names are drawn: /leave <event id>")]
    Leave { event_id: String },
    #[command(description = "List the events you take part in")]
    Events,
    #[command(description = "Show an event card: /event <event id>")]
    Event { event_id: String },
    #[command(description = "Choose the event your messages go to: /select <event id>")]
    Select { event_id: String },
    #[command(description = "Reopen registration (event admin): /open <event id>")]
    Open { event_id: String },
    #[command(description = "Close registration (event admin): /close <event id>")]
    Close { event_id: String },
    #[command(description = "Draw names and notify everyone (event admin): /distribute <event id>")]
    Distribute { event_id: String },
    #[command(rename = "send_buddy", description = "Send an anonymous message to the person you give a gift to")]
    SendBuddy,
    #[command(rename = "send_santa", description = "Send a message to your Secret Santa")]
    SendSanta,
    #[command(rename = "send_nicholas", description = "Send a message to your Saint Nicholas")]
    SendNicholas,
    #[command(description = "Cancel a message you were about to send")]
    Cancel,
}

impl Command {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Start { .. } => "start",
            Command::NewEvent { .. } => "newevent",
            Command::Join { .. } => "join",
            Command::Leave { .. } => "leave",
            Command::Events => "events",
            Command::Event { .. } => "event",
            Command::Select { .. } => "select",
            Command::Open { .. } => "open",
            Command::Close { .. } => "close",
            Command::Distribute { .. } => "distribute",
            Command::SendBuddy => "send_buddy",
            Command::SendSanta => "send_santa",
            Command::SendNicholas => "send_nicholas",
            Command::Cancel => "cancel",
        }
    }

    /// Send commands arm the pending relay slot instead of clearing it.
    pub fn starts_relay(&self) -> bool {
        matches!(
            self,
            Command::SendBuddy | Command::SendSanta | Command::SendNicholas
        )
    }
}

/// The user behind a command or callback.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub chat_id: ChatId,
}

impl Actor {
    pub fn new(user: &teloxide::types::User, chat_id: ChatId) -> Self {
        Self {
            id: user.id.0 as i64,
            name: user
                .username
                .clone()
                .unwrap_or_else(|| user.full_name()),
            chat_id,
        }
    }

    pub fn from_message(msg: &Message) -> Option<Self> {
        msg.from().map(|user| Self::new(user, msg.chat.id))
    }
}

/// Service failures that can be shown to the user.
///
/// Store failures are internal: they are logged and replaced by a generic
/// apology so no SQL detail leaks into the chat.
pub trait ServiceError: std::fmt::Display {
    fn internal_cause(&self) -> Option<String>;
}

impl ServiceError for RegistrationError {
    fn internal_cause(&self) -> Option<String> {
        match self {
            RegistrationError::Database(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl ServiceError for DistributionError {
    fn internal_cause(&self) -> Option<String> {
        match self {
            DistributionError::Database(e) => Some(e.to_string()),
            DistributionError::Pairing(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl ServiceError for RelayError {
    fn internal_cause(&self) -> Option<String> {
        match self {
            RelayError::Database(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl ServiceError for sqlx::Error {
    fn internal_cause(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// The reply text for a failed operation, logging it on the way.
pub fn describe_failure<E: ServiceError>(command: &str, actor: &Actor, error: &E) -> String {
    match error.internal_cause() {
        Some(cause) => {
            log_database_error(command, "store", &cause, Some(&format!("user {}", actor.id)));
            "Something went wrong on our side, please try again in a moment".to_string()
        }
        None => {
            log_command_error(command, &actor.name, actor.id, actor.chat_id.0, &error.to_string());
            capitalize(&error.to_string())
        }
    }
}

/// Sends a failed operation back to the user.
pub async fn report_failure<E: ServiceError>(
    feedback: &CommandFeedback,
    command: &str,
    actor: &Actor,
    error: &E,
) -> ResponseResult<()> {
    feedback.error(&describe_failure(command, actor, error)).await?;
    Ok(())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("only the event admin"), "Only the event admin");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_send_commands_start_relay() {
        assert!(Command::SendBuddy.starts_relay());
        assert!(Command::SendNicholas.starts_relay());
        assert!(!Command::Cancel.starts_relay());
        assert!(!Command::Events.starts_relay());
    }
}
