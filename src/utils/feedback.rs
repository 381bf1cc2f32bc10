//! Uniform replies for commands: an emoji tone marker plus escaped text.

use sqlx::SqlitePool;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};

use crate::bot::history::record_outbound;
use crate::utils::markdown::escape_markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackType {
    Success,
    Error,
    Info,
    Processing,
}

impl FeedbackType {
    fn emoji(&self) -> &'static str {
        match self {
            FeedbackType::Success => "✅",
            FeedbackType::Error => "❌",
            FeedbackType::Info => "ℹ️",
            FeedbackType::Processing => "⏳",
        }
    }
}

/// MarkdownV2 body of a feedback message. `message` is plain text.
pub fn format_feedback(feedback_type: FeedbackType, message: &str) -> String {
    format!("{} {}", feedback_type.emoji(), escape_markdown(message))
}

/// A failure followed by a hint on how to fix it.
pub fn format_validation_error(error: &str, suggestion: &str) -> String {
    format!(
        "{}\n\n💡 {}",
        format_feedback(FeedbackType::Error, error),
        escape_markdown(suggestion)
    )
}

/// Replies to one chat. Every reply is added to the message log.
pub struct CommandFeedback {
    bot: Bot,
    chat_id: ChatId,
    pool: SqlitePool,
}

impl CommandFeedback {
    pub fn new(bot: Bot, chat_id: ChatId, pool: SqlitePool) -> Self {
        Self { bot, chat_id, pool }
    }

    async fn send_formatted(&self, text: String) -> ResponseResult<Message> {
        let sent = self
            .bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::MarkdownV2)
            .await;
        record_outbound(&self.pool, self.chat_id, &sent, None).await;
        sent
    }

    pub async fn send(&self, feedback_type: FeedbackType, message: &str) -> ResponseResult<Message> {
        self.send_formatted(format_feedback(feedback_type, message)).await
    }

    /// Rewrites a message sent earlier, e.g. a progress line.
    pub async fn update_message(
        &self,
        message_id: MessageId,
        feedback_type: FeedbackType,
        message: &str,
    ) -> ResponseResult<Message> {
        self.bot
            .edit_message_text(self.chat_id, message_id, format_feedback(feedback_type, message))
            .parse_mode(ParseMode::MarkdownV2)
            .await
    }

    pub async fn success(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Success, message).await
    }

    pub async fn error(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Error, message).await
    }

    pub async fn info(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Info, message).await
    }

    pub async fn validation_error(&self, error: &str, suggestion: &str) -> ResponseResult<Message> {
        self.send_formatted(format_validation_error(error, suggestion)).await
    }
}

/// Single message that is edited as a multi-step operation advances.
pub struct ProgressTracker {
    feedback: CommandFeedback,
    message_id: Option<MessageId>,
    total_steps: u32,
    current_step: u32,
}

impl ProgressTracker {
    pub fn new(feedback: CommandFeedback, total_steps: u32) -> Self {
        Self {
            feedback,
            message_id: None,
            total_steps,
            current_step: 0,
        }
    }

    fn step_line(&self, message: &str) -> String {
        format!("{} ({}/{})", message, self.current_step, self.total_steps)
    }

    pub async fn start(&mut self, initial_message: &str) -> ResponseResult<()> {
        self.current_step = 1;
        let message = self
            .feedback
            .send(FeedbackType::Processing, &self.step_line(initial_message))
            .await?;
        self.message_id = Some(message.id);
        Ok(())
    }

    pub async fn next_step(&mut self, step_message: &str) -> ResponseResult<()> {
        let Some(message_id) = self.message_id else {
            return Ok(());
        };

        self.current_step = (self.current_step + 1).min(self.total_steps);
        self.feedback
            .update_message(message_id, FeedbackType::Processing, &self.step_line(step_message))
            .await?;
        Ok(())
    }

    pub async fn complete(&mut self, completion_message: &str) -> ResponseResult<()> {
        self.finish(FeedbackType::Success, completion_message).await
    }

    pub async fn error(&mut self, error_message: &str) -> ResponseResult<()> {
        self.finish(FeedbackType::Error, error_message).await
    }

    /// Without a progress message (start failed) the result is sent as a new one.
    async fn finish(&mut self, feedback_type: FeedbackType, message: &str) -> ResponseResult<()> {
        match self.message_id {
            Some(message_id) => {
                self.feedback.update_message(message_id, feedback_type, message).await?;
            }
            None => {
                self.feedback.send(feedback_type, message).await?;
            }
        }
        Ok(())
    }
}
