use std::env;
use tracing::Level;
use url::Url;

const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org/";

#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone)]
pub(crate) struct TelegramAlertConfig {
    pub(crate) api_base: Url,
    pub(crate) bot_token: String,
    pub(crate) chat_id: i64,
    pub(crate) min_level: Level,
}

#[derive(Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    pub(crate) telegram: Option<TelegramAlertConfig>,
    /// Warnings captured during config parsing so they can be logged after tracing is initialized.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();

        let service_name = env_string("SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = env_string("STAGE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let service_context = ServiceContext {
            service_name,
            environment,
            component,
        };

        let (telegram, warnings) = telegram_from_env();

        Self {
            service_context,
            telegram,
            warnings,
        }
    }
}

fn telegram_from_env() -> (Option<TelegramAlertConfig>, Vec<String>) {
    let mut warnings = Vec::new();

    if !env_bool("ALERT_NOTIFY_ENABLED").unwrap_or(true) {
        return (None, warnings);
    }

    let chat_id = match env_string("ALERT_TELEGRAM_CHAT_ID").filter(|v| !v.trim().is_empty()) {
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(chat_id) => chat_id,
            Err(err) => {
                warnings.push(format!(
                    "ALERT_TELEGRAM_CHAT_ID is invalid (value: {raw}); error alerts disabled ({err})"
                ));
                return (None, warnings);
            }
        },
        None => return (None, warnings),
    };

    let Some(bot_token) = env_string("TELEGRAM_BOT_TOKEN").filter(|v| !v.trim().is_empty()) else {
        warnings.push(
            "ALERT_TELEGRAM_CHAT_ID is set but TELEGRAM_BOT_TOKEN is missing; error alerts disabled"
                .to_string(),
        );
        return (None, warnings);
    };

    let api_base = match parse_api_base(env_string("TELEGRAM_API_URL")) {
        Ok(url) => url,
        Err(err) => {
            // The url is safe to print; the token is never part of it here.
            warnings.push(format!(
                "TELEGRAM_API_URL is invalid; error alerts disabled (parse error: {err})"
            ));
            return (None, warnings);
        }
    };

    let min_level = match env_string("ALERT_NOTIFY_LEVEL") {
        Some(raw) if !raw.trim().is_empty() => match parse_level(&raw) {
            Some(level) => level,
            None => {
                warnings.push(format!(
                    "ALERT_NOTIFY_LEVEL is invalid (value: {raw}); defaulting to ERROR"
                ));
                Level::ERROR
            }
        },
        _ => Level::ERROR,
    };

    (
        Some(TelegramAlertConfig {
            api_base,
            bot_token,
            chat_id,
            min_level,
        }),
        warnings,
    )
}

/// Parses a Bot API base url, defaulting to the public endpoint and forcing a trailing slash
/// so relative joins keep the full path.
pub fn parse_api_base(raw: Option<String>) -> Result<Url, url::ParseError> {
    let raw = raw
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string());
    let normalized = if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
