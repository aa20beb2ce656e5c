// Rust guideline compliant 2026-10-19

//! Telegram Bot API adapters.
//!
//! - [`TelegramNotifier`] implements the `Notifier` port with `sendMessage`
//!   (HTML parse mode; silent notifications set `disable_notification`).
//! - [`TelegramCommands`] long-polls `getUpdates` and answers `/balance` in
//!   the configured chat. Messages from any other chat are ignored.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use domain::{BalanceSource, Notification, Notifier, NotifyError};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const API_BASE: &str = "https://api.telegram.org";

/// Server-side wait of one `getUpdates` call.
const LONG_POLL: Duration = Duration::from_secs(30);

/// Total bound on one `sendMessage` or `setMyCommands` request.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed `getUpdates` call.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

const BALANCE_COMMAND: &str = "/balance";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// One entry of a `getUpdates` result. Only text messages are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    /// Monotonic update identifier; the next offset is `update_id + 1`.
    pub update_id: i64,
    /// The new incoming message, if this update carries one.
    pub message: Option<Message>,
}

/// Subset of a Telegram `Message`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    /// Chat the message was posted in.
    pub chat: Chat,
    /// Text body; `None` for stickers, photos, and the like.
    pub text: Option<String>,
}

/// Subset of a Telegram `Chat`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    /// Numeric chat identifier (negative for groups).
    pub id: i64,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram rejected {method}: {description}")]
    Rejected { method: &'static str, description: String },
    #[error("telegram response to {method} not understood: {reason}")]
    Malformed { method: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// TelegramApi
// ---------------------------------------------------------------------------

/// Minimal Bot API client shared by the notifier and the command listener.
#[derive(Clone)]
pub struct TelegramApi {
    http: reqwest::Client,
    poll_http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // base_url embeds the bot token.
        f.debug_struct("TelegramApi").finish_non_exhaustive()
    }
}

impl TelegramApi {
    /// Create a client for `bot_token`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::DeliveryFailed` when an HTTP client cannot be built.
    pub fn new(bot_token: &str) -> Result<Self, NotifyError> {
        let build = |timeout: Duration| {
            reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| NotifyError::DeliveryFailed { reason: e.to_string() })
        };
        Ok(Self {
            http: build(SEND_TIMEOUT)?,
            poll_http: build(LONG_POLL + Duration::from_secs(10))?,
            base_url: format!("{API_BASE}/bot{bot_token}"),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        client: &reqwest::Client,
        method: &'static str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await?;
        // Error replies carry a JSON description alongside a 4xx status.
        let text = response.text().await?;
        decode_response(method, &text)
    }

    /// Post `text` to `chat_id` in HTML parse mode.
    async fn send_message(&self, chat_id: &str, text: &str, silent: bool) -> Result<(), ApiError> {
        let body = send_message_body(chat_id, text, silent);
        self.call::<serde_json::Value>(&self.http, "sendMessage", &body).await?;
        Ok(())
    }

    async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, ApiError> {
        let body = get_updates_body(offset, LONG_POLL);
        self.call(&self.poll_http, "getUpdates", &body).await
    }

    async fn set_my_commands(&self) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "commands": [
                { "command": "balance", "description": "Show RunPod balance and hours left" }
            ]
        });
        self.call::<bool>(&self.http, "setMyCommands", &body).await?;
        Ok(())
    }
}

fn send_message_body(chat_id: &str, text: &str, silent: bool) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_notification": silent,
    })
}

fn get_updates_body(offset: Option<i64>, timeout: Duration) -> serde_json::Value {
    let mut body = serde_json::json!({
        "timeout": timeout.as_secs(),
        "allowed_updates": ["message"],
    });
    if let Some(offset) = offset {
        body["offset"] = serde_json::json!(offset);
    }
    body
}

fn decode_response<T: DeserializeOwned>(method: &'static str, text: &str) -> Result<T, ApiError> {
    let response: ApiResponse<T> = serde_json::from_str(text)
        .map_err(|e| ApiError::Malformed { method, reason: e.to_string() })?;
    if !response.ok {
        return Err(ApiError::Rejected {
            method,
            description: response.description.unwrap_or_else(|| "no description".to_owned()),
        });
    }
    response
        .result
        .ok_or_else(|| ApiError::Malformed { method, reason: "missing result".to_owned() })
}

/// `true` for `/balance`, `/balance@SomeBot`, and either followed by arguments.
fn is_balance_command(text: &str) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    let name = command.split_once('@').map_or(command, |(name, _bot)| name);
    name == BALANCE_COMMAND
}

// ---------------------------------------------------------------------------
// TelegramNotifier
// ---------------------------------------------------------------------------

/// `Notifier` adapter that posts every notification to one chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    api: TelegramApi,
    chat_id: String,
}

impl TelegramNotifier {
    /// Deliver to `chat_id` through `api`.
    #[must_use]
    pub fn new(api: TelegramApi, chat_id: impl Into<String>) -> Self {
        Self { api, chat_id: chat_id.into() }
    }
}

impl Notifier for TelegramNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.api
            .send_message(&self.chat_id, &notification.text, notification.is_silent())
            .await
            .map_err(|e| NotifyError::DeliveryFailed { reason: e.to_string() })
    }
}

// ---------------------------------------------------------------------------
// TelegramCommands
// ---------------------------------------------------------------------------

/// Long-polling listener for the `/balance` chat command.
#[derive(Debug)]
pub struct TelegramCommands {
    api: TelegramApi,
    allowed_chat_id: String,
}

impl TelegramCommands {
    /// Answer commands posted in `allowed_chat_id` only.
    #[must_use]
    pub fn new(api: TelegramApi, allowed_chat_id: impl Into<String>) -> Self {
        Self { api, allowed_chat_id: allowed_chat_id.into() }
    }

    /// Publish the command list to Telegram. Failure is logged and ignored.
    pub async fn register(&self) {
        match self.api.set_my_commands().await {
            Ok(()) => tracing::info!("telegram.commands.registered"),
            Err(e) => tracing::warn!(error = %e, "telegram.commands.register_failed"),
        }
    }

    /// Poll for updates forever, answering `/balance` from `source`.
    pub async fn run<B: BalanceSource>(&self, source: &B) {
        let mut offset = None;
        loop {
            let updates = match self.api.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "telegram.updates.failed");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                    continue;
                }
            };
            for update in updates {
                offset = Some(update.update_id + 1);
                if let Some(chat_id) = self.balance_request(&update) {
                    self.answer_balance(source, &chat_id).await;
                }
            }
        }
    }

    /// Chat id to answer when `update` is a `/balance` command from the allowed chat.
    fn balance_request(&self, update: &Update) -> Option<String> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?;
        if !is_balance_command(text) {
            return None;
        }
        let chat_id = message.chat.id.to_string();
        if chat_id != self.allowed_chat_id {
            tracing::debug!(chat_id = %chat_id, "telegram.command.ignored: foreign chat");
            return None;
        }
        Some(chat_id)
    }

    async fn answer_balance<B: BalanceSource>(&self, source: &B, chat_id: &str) {
        let text = match source.fetch().await {
            Ok(snapshot) => templates::balance_command(&snapshot, Utc::now()),
            Err(e) => {
                tracing::error!(error = %e, "telegram.command.fetch_failed");
                templates::balance_command_error(&e.to_string())
            }
        };
        if let Err(e) = self.api.send_message(chat_id, &text, false).await {
            tracing::error!(error = %e, "telegram.command.reply_failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
