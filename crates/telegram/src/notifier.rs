use async_trait::async_trait;
use teloxide::{prelude::*, types::ParseMode};

use common::{Error, Notifier, Result};

/// Sends alarm notifications as Markdown chat messages.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(recipient), text)
            .parse_mode(ParseMode::Markdown)
            .await
            .map(|_| ())
            .map_err(|e| Error::Notification(e.to_string()))
    }
}
