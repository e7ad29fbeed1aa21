//! Telegram notification delivery.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::{error, info, warn};

use super::Notifier;

/// Notifier that sends messages through a Telegram bot.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    /// Create a notifier from a bot token.
    pub fn new(bot_token: &str) -> Self {
        info!("Telegram notifier initialized");
        Self {
            bot: Bot::new(bot_token),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: i64, text: &str, markdown: bool) {
        let chat = ChatId(chat_id);

        if markdown {
            match self
                .bot
                .send_message(chat, text)
                .parse_mode(ParseMode::Markdown)
                .await
            {
                Ok(_) => return,
                Err(e) => {
                    // Formatting errors are common with upstream question
                    // text; retry unformatted.
                    warn!(chat_id, error = %e, "Markdown send failed, retrying as plain text");
                }
            }
        }

        if let Err(e) = self.bot.send_message(chat, text).await {
            error!(chat_id, error = %e, "Failed to send message");
        }
    }
}
