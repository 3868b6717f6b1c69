//! Chat transport seam
//!
//! The core only needs to deliver text to a chat. Adapters (Telegram in the
//! frontend crate, recording mocks in tests) implement `ChatTransport`.

use async_trait::async_trait;

/// Inbound chat message as seen by the command handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver HTML text to a chat with link previews disabled
    async fn send_message(&self, target: i64, text: &str) -> anyhow::Result<()>;

    /// Unprompted delivery such as the daily report. Adapters that can should
    /// skip the notification sound.
    async fn send_silent(&self, target: i64, text: &str) -> anyhow::Result<()> {
        self.send_message(target, text).await
    }
}
