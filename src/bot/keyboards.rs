//! Inline keyboard of the event card and its callback data.
//!
//! Callback data has the form `event:<action>:<event id>`. Permission checks
//! happen when the callback arrives, so the keyboard only depends on the
//! event status.

use std::fmt;
use std::str::FromStr;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::database::models::{Event, EventStatus};

const CALLBACK_PREFIX: &str = "event";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Join,
    Leave,
    Open,
    Close,
    Distribute,
    Select,
    Refresh,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Join => "join",
            EventAction::Leave => "leave",
            EventAction::Open => "open",
            EventAction::Close => "close",
            EventAction::Distribute => "distribute",
            EventAction::Select => "select",
            EventAction::Refresh => "refresh",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(EventAction::Join),
            "leave" => Ok(EventAction::Leave),
            "open" => Ok(EventAction::Open),
            "close" => Ok(EventAction::Close),
            "distribute" => Ok(EventAction::Distribute),
            "select" => Ok(EventAction::Select),
            "refresh" => Ok(EventAction::Refresh),
            _ => Err(()),
        }
    }
}

pub fn callback_data(action: EventAction, event_id: i64) -> String {
    format!("{CALLBACK_PREFIX}:{action}:{event_id}")
}

pub fn parse_callback_data(data: &str) -> Option<(EventAction, i64)> {
    let mut parts = data.split(':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }

    let action = parts.next()?.parse().ok()?;
    let event_id = parts.next()?.parse::<i64>().ok().filter(|id| *id > 0)?;

    if parts.next().is_some() {
        return None;
    }
    Some((action, event_id))
}

fn button(text: &str, action: EventAction, event_id: i64) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.to_string(), callback_data(action, event_id))
}

pub fn event_keyboard(event: &Event) -> InlineKeyboardMarkup {
    let id = event.id;

    let rows = match event.status {
        EventStatus::RegisterOpen => vec![
            vec![
                button("🎁 Join", EventAction::Join, id),
                button("🚪 Leave", EventAction::Leave, id),
            ],
            vec![
                button("🔒 Close registration", EventAction::Close, id),
                button("🔄 Refresh", EventAction::Refresh, id),
            ],
        ],
        EventStatus::RegisterClosed => vec![
            vec![
                button("🔓 Reopen registration", EventAction::Open, id),
                button("🎲 Draw names", EventAction::Distribute, id),
            ],
            vec![
                button("🚪 Leave", EventAction::Leave, id),
                button("🔄 Refresh", EventAction::Refresh, id),
            ],
        ],
        EventStatus::ParticipantsDistributed => vec![vec![
            button("✉️ Use for messages", EventAction::Select, id),
            button("🔄 Refresh", EventAction::Refresh, id),
        ]],
    };

    InlineKeyboardMarkup::new(rows)
}
