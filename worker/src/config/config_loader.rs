use super::config_model::{
    Database, DotEnvyConfig, Internal, PaymentGatewayConfig, Payments, Provisioning, Schedules,
    Telegram, WorkerServer,
};
use crate::scheduler::schedule::HourWindow;
use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use std::time::Duration;
use url::Url;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: var_or("SERVER_PORT_WORKER", "8081")
            .parse()
            .context("SERVER_PORT_WORKER is invalid")?,
        timeout: var_or("SERVER_TIMEOUT", "30")
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
        body_limit: var_or("SERVER_BODY_LIMIT", "1")
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        pool_size: var_or("DATABASE_POOL_SIZE", "10")
            .parse()
            .context("DATABASE_POOL_SIZE is invalid")?,
    };

    let telegram = Telegram {
        api_base: vpnbot::observability::parse_api_base(std::env::var("TELEGRAM_API_URL").ok())
            .context("TELEGRAM_API_URL is invalid")?,
        bot_token: required("TELEGRAM_BOT_TOKEN")?,
    };

    let payments = match var_or("PAYMENT_MODE", "gateway")
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "gateway" => Payments::Gateway(PaymentGatewayConfig {
            base_url: required_url("PAYMENT_GATEWAY_URL")?,
            api_key: required("PAYMENT_GATEWAY_API_KEY")?,
        }),
        "manual" => Payments::Manual,
        other => bail!("PAYMENT_MODE is invalid: {other:?} (expected gateway or manual)"),
    };

    let provisioning = Provisioning {
        base_url: required_url("PROVISIONING_API_URL")?,
        token: required("PROVISIONING_API_TOKEN")?,
    };

    let timezone: Tz = var_or("SCHEDULER_TIMEZONE", "Europe/Moscow")
        .trim()
        .parse()
        .map_err(|err| anyhow::anyhow!("SCHEDULER_TIMEZONE is invalid: {err}"))?;

    let reconcile_interval_secs: u64 = var_or("RECONCILE_INTERVAL_SECS", "30")
        .parse()
        .context("RECONCILE_INTERVAL_SECS is invalid")?;
    if reconcile_interval_secs == 0 {
        bail!("RECONCILE_INTERVAL_SECS must be greater than zero");
    }

    let expiration_run_hour: u32 = var_or("EXPIRATION_RUN_HOUR", "10")
        .parse()
        .context("EXPIRATION_RUN_HOUR is invalid")?;
    if expiration_run_hour > 23 {
        bail!("EXPIRATION_RUN_HOUR must be within 0..=23");
    }

    let disable_reminder_after_hours =
        parse_reminder_threshold(&var_or("DISABLE_REMINDER_AFTER_HOURS", "24"))
            .context("DISABLE_REMINDER_AFTER_HOURS is invalid")?;

    let schedules = Schedules {
        timezone,
        reconcile_interval: Duration::from_secs(reconcile_interval_secs),
        expiration_run_hour,
        expiration_notice_days: parse_day_list(&var_or("EXPIRATION_NOTICE_DAYS", "0,3"))
            .context("EXPIRATION_NOTICE_DAYS is invalid")?,
        disable_reminder_after_hours,
        disable_reminder_hours: parse_hour_window(&var_or("DISABLE_REMINDER_HOURS", "10-21"))
            .context("DISABLE_REMINDER_HOURS is invalid")?,
    };

    let internal = Internal {
        worker_token: non_empty(std::env::var("INTERNAL_WORKER_TOKEN").ok()),
        http_timeout: Duration::from_secs(
            var_or("HTTP_CLIENT_TIMEOUT_SECS", "15")
                .parse()
                .context("HTTP_CLIENT_TIMEOUT_SECS is invalid")?,
        ),
    };

    Ok(DotEnvyConfig {
        worker_server,
        database,
        telegram,
        payments,
        provisioning,
        schedules,
        internal,
    })
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &str) -> Result<String> {
    non_empty(std::env::var(key).ok()).with_context(|| format!("{key} is invalid"))
}

fn required_url(key: &str) -> Result<Url> {
    let raw = required(key)?;
    Url::parse(&raw).with_context(|| format!("{key} is invalid"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

/// `"0,3"` -> `[0, 3]`, sorted and deduplicated.
pub fn parse_day_list(raw: &str) -> Result<Vec<u32>> {
    let mut days = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .with_context(|| format!("{part:?} is not a day count"))
        })
        .collect::<Result<Vec<_>>>()?;

    if days.is_empty() {
        bail!("at least one day offset is required");
    }

    days.sort_unstable();
    days.dedup();
    Ok(days)
}

/// Roughly a century; keeps `chrono::Duration::hours` far from its range limit.
pub const MAX_REMINDER_AFTER_HOURS: i64 = 24 * 365 * 100;

pub fn parse_reminder_threshold(raw: &str) -> Result<i64> {
    let hours: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{raw:?} is not an hour count"))?;
    if !(0..=MAX_REMINDER_AFTER_HOURS).contains(&hours) {
        bail!("{hours} must be within 0..={MAX_REMINDER_AFTER_HOURS}");
    }
    Ok(hours)
}

/// `"10-21"` -> hours 10 through 21 inclusive.
pub fn parse_hour_window(raw: &str) -> Result<HourWindow> {
    let (start, end) = raw
        .split_once('-')
        .with_context(|| format!("{raw:?} is not of the form <start>-<end>"))?;
    let start: u32 = start.trim().parse().context("start hour is invalid")?;
    let end: u32 = end.trim().parse().context("end hour is invalid")?;

    HourWindow::new(start, end).with_context(|| format!("{raw:?} must satisfy start <= end <= 23"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_list_is_sorted_and_deduplicated() {
        assert_eq!(parse_day_list("3, 0,3").unwrap(), vec![0, 3]);
        assert_eq!(parse_day_list("1").unwrap(), vec![1]);
    }

    #[test]
    fn day_list_rejects_garbage_and_empty() {
        assert!(parse_day_list("").is_err());
        assert!(parse_day_list("1,x").is_err());
        assert!(parse_day_list("-1").is_err());
    }

    #[test]
    fn hour_window_parses_inclusive_range() {
        let window = parse_hour_window("10-21").unwrap();
        assert_eq!(window, HourWindow { start: 10, end: 21 });
        assert!(window.contains(21));
        assert!(!window.contains(22));
    }

    #[test]
    fn hour_window_rejects_inverted_or_out_of_range() {
        assert!(parse_hour_window("21-10").is_err());
        assert!(parse_hour_window("10-24").is_err());
        assert!(parse_hour_window("10").is_err());
    }

    #[test]
    fn reminder_threshold_is_bounded() {
        assert_eq!(parse_reminder_threshold(" 24 ").unwrap(), 24);
        assert_eq!(
            parse_reminder_threshold("876000").unwrap(),
            MAX_REMINDER_AFTER_HOURS
        );
        assert!(parse_reminder_threshold("876001").is_err());
        assert!(parse_reminder_threshold("9223372036854775807").is_err());
        assert!(parse_reminder_threshold("-1").is_err());
        assert!(parse_reminder_threshold("day").is_err());
    }

    #[test]
    fn non_empty_trims_and_drops_blank() {
        assert_eq!(
            non_empty(Some("  token ".into())),
            Some("token".to_string())
        );
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
