//! One-line log records with a fixed prefix per category, so they can be
//! grepped out of the combined output.
//!
//! Nothing here may carry pairing results or relayed message content.

use tracing::{debug, error, info, warn};

fn with_details(line: String, details: Option<&str>) -> String {
    match details {
        Some(d) => format!("{line} - {d}"),
        None => line,
    }
}

fn actor_line(command: &str, user: &str, user_id: i64, chat_id: i64) -> String {
    format!("{command} by {user}({user_id}) in chat {chat_id}")
}

pub fn log_command_start(command: &str, user: &str, user_id: i64, chat_id: i64, details: Option<&str>) {
    info!("CMD_START: {}", with_details(actor_line(command, user, user_id, chat_id), details));
}

pub fn log_command_success(command: &str, user: &str, user_id: i64, chat_id: i64, details: Option<&str>) {
    info!("CMD_SUCCESS: {}", with_details(actor_line(command, user, user_id, chat_id), details));
}

/// A command that ended with a refusal the user is shown.
pub fn log_command_error(command: &str, user: &str, user_id: i64, chat_id: i64, error: &str) {
    warn!("CMD_ERROR: {} - {}", actor_line(command, user, user_id, chat_id), error);
}

pub fn log_validation_error(command: &str, field: &str, value: &str, error: &str, user_id: i64) {
    warn!("VALIDATION_ERROR: {command} - {field} '{value}' rejected for user {user_id}: {error}");
}

pub fn log_database_error(operation: &str, table: &str, error: &str, details: Option<&str>) {
    error!("DB_ERROR: {}", with_details(format!("{operation} on {table} failed: {error}"), details));
}

/// Never pass participant names or assignments here.
pub fn log_pairing_event(event: &str, details: &str) {
    debug!("PAIRING: {event} - {details}");
}

/// Participants are identified by id only.
pub fn log_relay_event(event: &str, event_id: i64, from_participant: i64, details: Option<&str>) {
    info!(
        "RELAY: {}",
        with_details(format!("{event} in event {event_id} from participant {from_participant}"), details)
    );
}

pub fn log_system_event(event: &str, details: Option<&str>) {
    info!("SYSTEM: {}", with_details(event.to_string(), details));
}
