mod config;
mod layer;
mod notifier;
mod telegram;

use anyhow::Result;
use config::ObservabilityConfig;
use layer::AlertLayer;
use notifier::{NotificationProvider, Notifier};
use std::sync::Arc;
use telegram::TelegramAlertProvider;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use config::parse_api_base;

/// Installs the global subscriber: local-time fmt output, `RUST_LOG` filtering (default
/// `info`) and, when configured, ERROR alerts forwarded to an operator Telegram chat.
/// Must be called inside a tokio runtime.
pub fn init_observability(component: &str) -> Result<()> {
    let mut config = ObservabilityConfig::from_env(component);

    let alert_layer = match config.telegram.clone() {
        Some(telegram) => match TelegramAlertProvider::new(telegram.clone()) {
            Ok(provider) => {
                let providers: Vec<Arc<dyn NotificationProvider>> = vec![Arc::new(provider)];
                Some(
                    AlertLayer::new(
                        Notifier::new(providers),
                        config.service_context.clone(),
                        telegram.min_level,
                    )
                    .with_filter(tracing_subscriber::filter::LevelFilter::from_level(
                        telegram.min_level,
                    )),
                )
            }
            Err(err) => {
                config
                    .warnings
                    .push(format!("Telegram alert client could not be built: {err}"));
                None
            }
        },
        None => None,
    };
    let alerts_enabled = alert_layer.is_some();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so operators read the same clock the schedules run on.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service_context.service_name,
            environment = %config.service_context.environment,
            component = %config.service_context.component,
            warning = %warning,
            "Observability config warning"
        );
    }

    info!(
        service = %config.service_context.service_name,
        environment = %config.service_context.environment,
        component = %config.service_context.component,
        alerts_enabled,
        "Observability initialised"
    );

    Ok(())
}
