use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{
    repositories::chat_channel::ChatChannel, value_objects::chat::InlineKeyboard,
};

/// Telegram Bot API client covering the two primitives the workers need.
/// https://core.telegram.org/bots/api#sendmessage
pub struct TelegramBotClient {
    http: reqwest::Client,
    api_base: Url,
    token: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

#[derive(Debug, Serialize)]
struct EditMessageTextRequest<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    /// Always sent so that an edit without buttons strips the old keyboard.
    reply_markup: &'a InlineKeyboard,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i32>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramBotClient {
    pub fn new(api_base: Url, token: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build telegram http client")?;

        Ok(Self {
            http,
            api_base,
            token,
        })
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        // The token is part of the path; never log this url. The "./" keeps `bot<id>:` from
        // being read as a url scheme.
        self.api_base
            .join(&format!("./bot{}/{}", self.token, method))
            .context("failed to build telegram method url")
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let resp = self
            .http
            .post(self.method_url(method)?)
            .json(body)
            .send()
            .await
            .map_err(|err| sanitize_reqwest_error(method, err))?;

        // Telegram reports failures in the JSON envelope with a matching HTTP status.
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|err| sanitize_reqwest_error(method, err))?;
        Ok(parsed)
    }
}

#[async_trait]
impl ChatChannel for TelegramBotClient {
    async fn send(
        &self,
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<i64> {
        let request = SendMessageRequest {
            chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
            reply_markup: keyboard.as_ref().filter(|k| !k.is_empty()),
        };

        let response: ApiResponse<SentMessage> = self.call("sendMessage", &request).await?;
        match response {
            ApiResponse {
                ok: true,
                result: Some(message),
                ..
            } => {
                debug!(chat_id, message_id = message.message_id, "telegram: message sent");
                Ok(message.message_id)
            }
            other => Err(anyhow!(
                "telegram sendMessage failed (code {:?}): {}",
                other.error_code,
                other.description.unwrap_or_default()
            )),
        }
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()> {
        let keyboard = keyboard.unwrap_or_default();
        let request = EditMessageTextRequest {
            chat_id,
            message_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
            reply_markup: &keyboard,
        };

        let response: ApiResponse<serde_json::Value> =
            self.call("editMessageText", &request).await?;
        if response.ok {
            return Ok(());
        }

        let description = response.description.unwrap_or_default();
        if is_not_modified(&description) {
            warn!(chat_id, message_id, "telegram: edit skipped, message not modified");
            return Ok(());
        }

        Err(anyhow!(
            "telegram editMessageText failed (code {:?}): {}",
            response.error_code,
            description
        ))
    }
}

fn is_not_modified(description: &str) -> bool {
    description.contains("message is not modified")
}

fn sanitize_reqwest_error(method: &str, error: reqwest::Error) -> anyhow::Error {
    // reqwest errors embed the request url, which carries the bot token.
    let error = error.without_url();
    if error.is_timeout() {
        return anyhow!("telegram {method} request timed out");
    }
    if error.is_connect() {
        return anyhow!("telegram {method} connection failed");
    }
    anyhow!("telegram {method} request failed: {error}")
}
