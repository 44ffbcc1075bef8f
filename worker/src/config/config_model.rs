use chrono_tz::Tz;
use std::time::Duration;
use url::Url;

use crate::scheduler::schedule::HourWindow;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub telegram: Telegram,
    pub payments: Payments,
    pub provisioning: Provisioning,
    pub schedules: Schedules,
    pub internal: Internal,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct Telegram {
    pub api_base: Url,
    pub bot_token: String,
}

#[derive(Debug, Clone)]
pub enum Payments {
    Gateway(PaymentGatewayConfig),
    /// Operators confirm payments by hand; the reconciliation worker does not run.
    Manual,
}

impl Payments {
    pub fn gateway(&self) -> Option<&PaymentGatewayConfig> {
        match self {
            Payments::Gateway(config) => Some(config),
            Payments::Manual => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentGatewayConfig {
    pub base_url: Url,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Provisioning {
    pub base_url: Url,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct Schedules {
    pub timezone: Tz,
    pub reconcile_interval: Duration,
    pub expiration_run_hour: u32,
    pub expiration_notice_days: Vec<u32>,
    pub disable_reminder_after_hours: i64,
    pub disable_reminder_hours: HourWindow,
}

#[derive(Debug, Clone)]
pub struct Internal {
    pub worker_token: Option<String>,
    pub http_timeout: Duration,
}
