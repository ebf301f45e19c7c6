use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Pushes a message to a user outside of an update handler
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, html: &str) -> Result<(), NotifyError>;
}

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
    async fn notify(&self, user_id: i64, html: &str) -> Result<(), NotifyError> {
        self.bot
            .send_message(ChatId(user_id), html)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: tokio::sync::Mutex<Vec<(i64, String)>>,
    fail: bool,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Default::default(),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: i64, html: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Rejected("bot was blocked by the user".to_string()));
        }
        self.sent.lock().await.push((user_id, html.to_string()));
        Ok(())
    }
}
