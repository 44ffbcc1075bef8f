use super::config::TelegramAlertConfig;
use super::notifier::{NotificationEvent, NotificationProvider};
use crate::domain::value_objects::chat::escape_html;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;

const MESSAGE_LIMIT: usize = 4096;

/// Posts alerts into an operator chat through the same bot that serves the shop.
pub(crate) struct TelegramAlertProvider {
    config: TelegramAlertConfig,
    client: Client,
}

impl TelegramAlertProvider {
    pub(crate) fn new(config: TelegramAlertConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()?;

        Ok(Self { config, client })
    }

    fn format_content(event: &NotificationEvent) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "<b>{}</b> <code>{}</code> <code>{}</code> <code>{}</code>",
            escape_html(&event.service_name),
            escape_html(&event.environment),
            escape_html(&event.component),
            event.level.as_str()
        ));

        lines.push(format!(
            "<code>{}</code> <code>{}</code>{}",
            event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            escape_html(&event.target),
            match (&event.file, event.line) {
                (Some(file), Some(line)) => format!(" <code>{}:{}</code>", escape_html(file), line),
                _ => String::new(),
            }
        ));

        if let Some(message) = event.message.as_ref().filter(|m| !m.trim().is_empty()) {
            lines.push(format!("<blockquote>{}</blockquote>", escape_html(message.trim())));
        }

        if !event.spans.is_empty() {
            let span_chain = event
                .spans
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(" &gt; ");
            lines.push(format!("spans: <code>{}</code>", span_chain));
        }

        for (k, v) in &event.fields {
            lines.push(format!("• <code>{}</code> = <code>{}</code>", escape_html(k), escape_html(v)));
        }

        for span in event.spans.iter().filter(|s| !s.fields.is_empty()) {
            lines.push(format!("span <code>{}</code>:", escape_html(&span.name)));
            for (k, v) in &span.fields {
                lines.push(format!("• <code>{}</code> = <code>{}</code>", escape_html(k), escape_html(v)));
            }
        }

        truncate_lines(lines)
    }
}

#[async_trait]
impl NotificationProvider for TelegramAlertProvider {
    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        let url = self
            .config
            .api_base
            .join(&format!("./bot{}/sendMessage", self.config.bot_token))
            .map_err(|_| anyhow!("telegram alert url could not be built"))?;

        let response = self
            .client
            .post(url)
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": Self::format_content(event),
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "telegram alert returned non-success status: {}",
            response.status()
        ))
    }

    fn provider_name(&self) -> &'static str {
        "telegram"
    }
}

fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    // The request url carries the bot token.
    if error.is_timeout() {
        return anyhow!("telegram alert request timed out");
    }
    if error.is_connect() {
        return anyhow!("telegram alert connection failed");
    }
    anyhow!("telegram alert request failed")
}

/// Drops whole lines from the end so HTML tags are never cut in half.
fn truncate_lines(lines: Vec<String>) -> String {
    const SUFFIX: &str = "\n… (truncated)";

    let mut content = String::new();
    let mut used = 0;
    for (idx, line) in lines.iter().enumerate() {
        let cost = line.chars().count() + usize::from(idx > 0);
        if used + cost > MESSAGE_LIMIT - SUFFIX.chars().count() {
            content.push_str(SUFFIX);
            return content;
        }
        if idx > 0 {
            content.push('\n');
        }
        content.push_str(line);
        used += cost;
    }
    content
}
