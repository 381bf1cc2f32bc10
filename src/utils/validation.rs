use anyhow::{anyhow, Result};

use crate::database::models::EventKind;

pub const MAX_EVENT_NAME_LEN: usize = 100;
pub const MAX_EVENT_DESCRIPTION_LEN: usize = 2048;

/// Arguments of `/newevent <santa|nicholas> <name> | <description>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventArgs {
    pub kind: EventKind,
    pub name: String,
    pub description: String,
}

pub fn validate_event_name(name: &str) -> Result<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(anyhow!("Event name cannot be empty"));
    }

    if name.chars().count() < 3 {
        return Err(anyhow!("Event name must be at least 3 characters long"));
    }

    if name.chars().count() > MAX_EVENT_NAME_LEN {
        return Err(anyhow!(
            "Event name cannot be longer than {} characters",
            MAX_EVENT_NAME_LEN
        ));
    }

    if name.contains('\n') || name.contains('\r') {
        return Err(anyhow!("Event name cannot contain line breaks"));
    }

    Ok(())
}

pub fn validate_event_description(description: &str) -> Result<()> {
    if description.chars().count() > MAX_EVENT_DESCRIPTION_LEN {
        return Err(anyhow!(
            "Event description cannot be longer than {} characters",
            MAX_EVENT_DESCRIPTION_LEN
        ));
    }

    Ok(())
}

pub fn parse_event_kind(input: &str) -> Result<EventKind> {
    match input.trim().to_lowercase().as_str() {
        "santa" | "secret_santa" => Ok(EventKind::Santa),
        "nicholas" | "saint_nicholas" | "st_nicholas" => Ok(EventKind::SaintNicholas),
        other => Err(anyhow!(
            "Unknown event type '{}', use 'santa' or 'nicholas'",
            other
        )),
    }
}

/// Parses `<kind> <name> [| <description>]`.
pub fn parse_new_event(input: &str) -> Result<NewEventArgs> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("Event type and name are required"));
    }

    let (kind, rest) = input
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("Event name is required after the event type"))?;
    let kind = parse_event_kind(kind)?;

    let (name, description) = match rest.split_once('|') {
        Some((name, description)) => (name.trim(), description.trim()),
        None => (rest.trim(), ""),
    };

    validate_event_name(name)?;
    validate_event_description(description)?;

    Ok(NewEventArgs {
        kind,
        name: name.to_string(),
        description: description.to_string(),
    })
}

/// Parses the deep-link payload of `/start <event_id>`; an empty payload is a plain start.
pub fn parse_start_payload(payload: &str) -> Result<Option<i64>> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    let event_id = payload
        .strip_prefix("event_")
        .unwrap_or(payload)
        .parse::<i64>()
        .map_err(|_| anyhow!("Invalid invitation link"))?;
    validate_event_id(event_id)?;

    Ok(Some(event_id))
}

pub fn validate_event_id(event_id: i64) -> Result<()> {
    if event_id <= 0 {
        return Err(anyhow!("Event ID must be a positive number"));
    }

    Ok(())
}

/// Parses the `<event id>` argument of a command; `#12` is accepted too.
pub fn parse_event_id(input: &str) -> Result<i64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("Event ID is required"));
    }

    let event_id = input
        .strip_prefix('#')
        .unwrap_or(input)
        .parse::<i64>()
        .map_err(|_| anyhow!("Event ID must be a number"))?;
    validate_event_id(event_id)?;

    Ok(event_id)
}

/// Parses the comma separated `ADMIN_IDS` list.
pub fn parse_admin_ids(input: &str) -> Result<Vec<i64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| anyhow!("Invalid admin id '{}'", s))
        })
        .collect()
}
