//! Telegram Bot API transport
//!
//! Outbound messages go through [`TelegramClient`]. Inbound updates arrive
//! either on an axum webhook at `POST /{token}` or through long polling.

use super::dispatch::ChatDispatcher;
use crate::bot::RateBot;
use crate::error::{BotError, Result};
use crate::interface::{
    BotPlatform, BotResponse, ChatTransport, Formatter, FormatterFactory, Message,
    SuggestedAction,
};
use crate::models::ChatId;
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use fxbot_utils::{env_or, env_parse_or, env_required};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Long-poll timeout passed to `getUpdates`
const POLL_TIMEOUT_SECS: u64 = 25;

/// Telegram bot configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub token: String,

    /// Public base URL for webhook mode, e.g. `https://bot.example.com`
    pub domain: Option<String>,

    /// Port the webhook server listens on
    pub port: u16,

    /// Bot API base URL
    pub api_url: String,

    /// Timeout for ordinary API calls
    pub request_timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            domain: None,
            port: 8443,
            api_url: "https://api.telegram.org".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl TelegramConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let token = env_required("TELEGRAM_BOT_TOKEN")?;
        let domain = std::env::var("DOMAIN")
            .ok()
            .map(|d| d.trim_end_matches('/').to_string())
            .filter(|d| !d.is_empty());
        let defaults = Self::default();

        Ok(Self {
            token,
            domain,
            port: env_parse_or("PORT", defaults.port)?,
            api_url: env_or("TELEGRAM_API_URL", &defaults.api_url),
            request_timeout: Duration::from_secs(env_parse_or("REQUEST_TIMEOUT_SECS", 30u64)?),
        })
    }

    /// Webhook URL registered with Telegram
    pub fn webhook_url(&self) -> Option<String> {
        self.domain
            .as_ref()
            .map(|domain| format!("{domain}/{}", self.token))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub date: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
}

impl Update {
    /// Text message carried by this update, if any
    pub fn into_message(self) -> Option<Message> {
        let message = self.message?;
        let text = message.text?;
        let user_id = message.from.map_or(message.chat.id, |u| u.id);

        let mut converted = Message::text(message.chat.id, user_id, text)
            .with_id(message.message_id.to_string());
        if let Some(timestamp) = Utc.timestamp_opt(message.date, 0).single() {
            converted.timestamp = timestamp;
        }
        Some(converted)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Reply keyboard for `actions`, or a keyboard removal when there are none
fn reply_markup(actions: &[SuggestedAction]) -> Value {
    if actions.is_empty() {
        return json!({ "remove_keyboard": true });
    }
    let rows: Vec<Value> = actions
        .iter()
        .map(|a| json!([{ "text": a.action }]))
        .collect();
    json!({
        "keyboard": rows,
        "one_time_keyboard": true,
        "resize_keyboard": true,
    })
}

/// Telegram Bot API client
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    formatter: Arc<dyn Formatter>,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        // Long polls must outlive their own server-side timeout
        let timeout = config
            .request_timeout
            .max(Duration::from_secs(POLL_TIMEOUT_SECS + 10));
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_url.trim_end_matches('/'), config.token),
            formatter: Arc::from(FormatterFactory::create(BotPlatform::Telegram)),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn parse_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;
        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::TransportError(format!(
                "{method} failed ({status}): {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> Result<T> {
        debug!(method, "Calling Telegram API");
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await?;
        Self::parse_response(method, response).await
    }

    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        actions: &[SuggestedAction],
    ) -> Result<()> {
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": reply_markup(actions),
        });
        let _: Value = self.call("sendMessage", &payload).await?;
        Ok(())
    }

    pub async fn send_photo(&self, chat_id: ChatId, png: Vec<u8>, caption: &str) -> Result<()> {
        let part = Part::bytes(png)
            .file_name("chart.png")
            .mime_str("image/png")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", part);

        debug!(chat_id, "Uploading photo");
        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        let _: Value = Self::parse_response("sendPhoto", response).await?;
        Ok(())
    }

    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let _: bool = self.call("setWebhook", &json!({ "url": url })).await?;
        info!("Webhook registered");
        Ok(())
    }

    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut payload = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call("getUpdates", &payload).await
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    fn platform(&self) -> BotPlatform {
        BotPlatform::Telegram
    }

    async fn send(&self, chat_id: ChatId, response: BotResponse) -> Result<()> {
        let text = self.formatter.format_response(&response);
        match response.image() {
            Some(image) => self.send_photo(chat_id, image.content.clone(), &text).await,
            None => self.send_message(chat_id, &text, &response.actions).await,
        }
    }
}

#[derive(Clone)]
struct WebhookState {
    token: Arc<str>,
    dispatcher: ChatDispatcher,
}

async fn webhook_handler(
    State(state): State<WebhookState>,
    Path(token): Path<String>,
    Json(update): Json<Update>,
) -> StatusCode {
    if token.as_str() != state.token.as_ref() {
        return StatusCode::NOT_FOUND;
    }

    // Only queued here, slow commands must not hold up the acknowledgement
    let update_id = update.update_id;
    match update.into_message() {
        Some(message) => state.dispatcher.dispatch(message).await,
        None => debug!(update_id, "Skipping update without text"),
    }
    StatusCode::OK
}

/// Router serving the webhook at `POST /{token}` plus a health check
pub fn webhook_router(token: &str, bot: RateBot, transport: Arc<dyn ChatTransport>) -> Router {
    let state = WebhookState {
        token: Arc::from(token),
        dispatcher: ChatDispatcher::new(bot, transport),
    };
    Router::new()
        .route("/healthcheck", get(|| async { "OK" }))
        .route("/{token}", post(webhook_handler))
        .with_state(state)
}

/// Register the webhook and serve updates until `shutdown` resolves
pub async fn serve_webhook(
    config: &TelegramConfig,
    bot: RateBot,
    client: TelegramClient,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let url = config.webhook_url().ok_or_else(|| {
        BotError::ConfigError("DOMAIN must be set for webhook mode".to_string())
    })?;
    client.set_webhook(&url).await?;

    let app = webhook_router(&config.token, bot, Arc::new(client));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BotError::TransportError(format!("Failed to bind {addr}: {e}")))?;

    info!(%addr, "Webhook server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| BotError::TransportError(e.to_string()))
}

/// Long-poll `getUpdates` until `shutdown` resolves
pub async fn run_polling(
    bot: RateBot,
    client: TelegramClient,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<()> {
    client.delete_webhook().await?;
    let dispatcher = ChatDispatcher::new(bot, Arc::new(client.clone()));
    let mut offset = None;

    info!("Polling for updates");
    tokio::pin!(shutdown);
    loop {
        let updates = tokio::select! {
            () = &mut shutdown => break,
            result = client.get_updates(offset, POLL_TIMEOUT_SECS) => result,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let update_id = update.update_id;
                    match update.into_message() {
                        Some(message) => dispatcher.dispatch(message).await,
                        None => debug!(update_id, "Skipping update without text"),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }

    info!("Polling stopped");
    Ok(())
}
