use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Duration, sleep};

use farewatch_backend::config::TelegramConfig;
use farewatch_backend::module::handler::MessageHandler;
use farewatch_backend::module::transport::{ChatTransport, IncomingMessage};

/// Telegram rejects longer texts
pub const MAX_MESSAGE_LENGTH: usize = 4096;

const UNAUTHORIZED_TEXT: &str = "❌ У вас нет прав для использования этого бота.";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
}

#[derive(Serialize, Debug)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize, Debug)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disable_notification: bool,
}

impl Update {
    /// Text messages only; anything else is skipped by the poller
    fn into_incoming(self) -> Option<IncomingMessage> {
        let message = self.message?;
        let text = message.text?;
        Some(IncomingMessage {
            chat_id: message.chat.id,
            user_id: message.from.map_or(message.chat.id, |user| user.id),
            text,
        })
    }
}

/// Telegram Bot API client: long-polling receiver and HTML sender
pub struct TelegramBot {
    client: reqwest::Client,
    base_url: String,
    admin_user_ids: Vec<i64>,
    poll_timeout_secs: u64,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.token.is_empty(), "Telegram bot token is not configured");

        // Long polls must not hit the client timeout
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()?;

        // Accept both "https://api.telegram.org" and the "https://api.telegram.org/bot" form
        let api_url = config.api_url.trim_end_matches('/');
        let api_url = api_url.strip_suffix("/bot").unwrap_or(api_url);

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url, config.token),
            admin_user_ids: config.admin_user_ids.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    /// Empty allow-list lets everyone in
    pub fn is_user_allowed(&self, user_id: i64) -> bool {
        self.admin_user_ids.is_empty() || self.admin_user_ids.contains(&user_id)
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &P,
        timeout: Option<Duration>,
    ) -> anyhow::Result<T> {
        let url = format!("{}/{}", self.base_url, method);

        let mut request = self.client.post(&url).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let response: ApiResponse<T> = match resp.json().await {
            Ok(r) => r,
            Err(e) => anyhow::bail!("Failed to parse {} response (HTTP {}): {}", method, status, e),
        };

        if !response.ok {
            anyhow::bail!(
                "Telegram {} failed: {}",
                method,
                response.description.unwrap_or_else(|| status.to_string())
            );
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("Telegram {} returned no result", method))
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Update>> {
        let payload = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &payload, None).await
    }

    /// Send HTML text, split into several messages if it is too long
    pub async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.send_html(chat_id, text, false).await
    }

    async fn send_html(&self, chat_id: i64, text: &str, disable_notification: bool) -> anyhow::Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            let payload = SendMessageRequest {
                chat_id,
                text: &chunk,
                parse_mode: "HTML",
                disable_web_page_preview: true,
                disable_notification,
            };
            let _: serde_json::Value = self.call("sendMessage", &payload, Some(SEND_TIMEOUT)).await?;
        }

        tracing::debug!("Message sent to chat {}", chat_id);
        Ok(())
    }

    /// Check the sender and pass the message to the handler
    pub async fn dispatch(&self, handler: &MessageHandler, message: IncomingMessage) -> anyhow::Result<()> {
        if !self.is_user_allowed(message.user_id) {
            tracing::warn!("Rejected message from unauthorized user {}", message.user_id);
            return self.send_text(message.chat_id, UNAUTHORIZED_TEXT).await;
        }

        tracing::info!("Command from user {} in chat {}: {}", message.user_id, message.chat_id, message.text);
        handler.handle_message(&message).await
    }

    /// Poll forever. Each message is handled in its own task so a running
    /// search never holds up polling.
    pub async fn run(self: Arc<Self>, handler: Arc<MessageHandler>) {
        tracing::info!("Telegram polling started");
        let mut offset = 0;

        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("Failed to get updates: {}. Retrying in {:?}.", e, POLL_ERROR_BACKOFF);
                    sleep(POLL_ERROR_BACKOFF).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.into_incoming() else {
                    continue;
                };

                let bot = self.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    let chat_id = message.chat_id;
                    if let Err(e) = bot.dispatch(&handler, message).await {
                        tracing::error!("Failed to handle message in chat {}: {}", chat_id, e);
                    }
                });
            }
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramBot {
    async fn send_message(&self, target: i64, text: &str) -> anyhow::Result<()> {
        self.send_text(target, text).await
    }

    async fn send_silent(&self, target: i64, text: &str) -> anyhow::Result<()> {
        self.send_html(target, text, true).await
    }
}

/// Split `text` into chunks of at most `limit` characters, preferring blank
/// lines, then line breaks, then hard cuts.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if char_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        if char_len(paragraph) <= limit {
            append_piece(&mut chunks, &mut current, paragraph, "\n\n", limit);
            continue;
        }

        for (index, line) in paragraph.split('\n').enumerate() {
            let separator = if index == 0 { "\n\n" } else { "\n" };
            for (part, piece) in hard_wrap(line, limit).into_iter().enumerate() {
                let separator = if part == 0 { separator } else { "" };
                append_piece(&mut chunks, &mut current, &piece, separator, limit);
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn append_piece(chunks: &mut Vec<String>, current: &mut String, piece: &str, separator: &str, limit: usize) {
    if current.is_empty() {
        current.push_str(piece);
    } else if char_len(current) + char_len(separator) + char_len(piece) <= limit {
        current.push_str(separator);
        current.push_str(piece);
    } else {
        chunks.push(std::mem::take(current));
        current.push_str(piece);
    }
}

fn hard_wrap(line: &str, limit: usize) -> Vec<String> {
    if char_len(line) <= limit {
        return vec![line.to_string()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(limit).map(|c| c.iter().collect()).collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
