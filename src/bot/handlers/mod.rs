pub mod callback;
pub mod general_message;
pub mod message;

use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*};

use crate::bot::commands::Command;
use crate::database::connection::DatabaseManager;
use crate::database::models;
use crate::pairing::PairingSettings;
use crate::utils::logging::log_database_error;

type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything a handler needs, passed explicitly instead of living in globals.
#[derive(Clone)]
pub struct BotContext {
    pub db: DatabaseManager,
    pub admin_ids: Arc<Vec<i64>>,
    pub pairing: PairingSettings,
}

/// Refreshes the stored profile of whoever sent an update. Failures are only
/// logged; the update is still handled.
pub async fn remember_user(pool: &sqlx::SqlitePool, user: &teloxide::types::User) {
    let user_id = user.id.0 as i64;
    if let Err(e) = models::User::upsert(
        pool,
        user_id,
        user.username.clone(),
        user.full_name(),
        user.language_code.clone(),
    )
    .await
    {
        log_database_error("upsert", "users", &e.to_string(), Some(&format!("user {user_id}")));
    }
}

pub struct BotHandler {
    pub ctx: BotContext,
}

impl BotHandler {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub fn schema(&self) -> UpdateHandler<HandlerError> {
        let ctx_command = self.ctx.clone();
        let ctx_message = self.ctx.clone();
        let ctx_callback = self.ctx.clone();

        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let ctx = ctx_command.clone();
                        async move {
                            message::command_handler(bot, msg, cmd, ctx)
                                .await
                                .map_err(HandlerError::from)
                        }
                    }),
            )
            .branch(Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let ctx = ctx_message.clone();
                async move {
                    general_message::handle_general_message(bot, msg, ctx)
                        .await
                        .map_err(HandlerError::from)
                }
            }))
            .branch(Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let ctx = ctx_callback.clone();
                async move {
                    callback::callback_handler(bot, q, ctx)
                        .await
                        .map_err(HandlerError::from)
                }
            }))
    }
}
