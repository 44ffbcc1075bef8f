use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt::Write;
use vpnbot::domain::{
    entities::{
        pending_orders::PendingOrderEntity, subscriptions::SubscriptionEntity,
        tariffs::TariffEntity,
    },
    value_objects::{
        chat::{InlineKeyboard, escape_html},
        provisioning::ProvisionedCredential,
        subscription_actions::SubscriptionAction,
    },
};

/// Text plus optional keyboard, in Telegram HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

impl Notice {
    fn plain(text: String) -> Self {
        Self {
            text,
            keyboard: None,
        }
    }
}

pub fn format_date(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%d.%m.%Y").to_string()
}

fn format_day_offset(day_offset: u32) -> String {
    match day_offset {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {n} days"),
    }
}

fn subscription_lines(subscriptions: &[SubscriptionEntity], tz: Tz) -> String {
    let mut lines = String::new();
    for (index, subscription) in subscriptions.iter().enumerate() {
        let _ = writeln!(
            lines,
            "{}. {} · {}",
            index + 1,
            escape_html(&subscription.client_name),
            format_date(subscription.expires_at, tz)
        );
    }
    lines
}

pub fn expiring_summary(day_offset: u32, subscriptions: &[SubscriptionEntity], tz: Tz) -> String {
    format!(
        "<b>Subscriptions expiring {} ({})</b>\n\n{}",
        format_day_offset(day_offset),
        subscriptions.len(),
        subscription_lines(subscriptions, tz)
    )
}

/// Per-subscription notice offering renew, a fresh payment link or a tariff change.
pub fn expiring_notice(subscription: &SubscriptionEntity, day_offset: u32, tz: Tz) -> Notice {
    let id = subscription.id;
    Notice {
        text: format!(
            "⏳ <b>{}</b>\nSubscription expires {} ({}).",
            escape_html(&subscription.client_name),
            format_day_offset(day_offset),
            format_date(subscription.expires_at, tz)
        ),
        keyboard: Some(InlineKeyboard::single_column(vec![
            SubscriptionAction::Renew(id).button(),
            SubscriptionAction::RelinkPayment(id).button(),
            SubscriptionAction::ChangeTariff(id).button(),
        ])),
    }
}

pub fn overdue_summary(subscriptions: &[SubscriptionEntity], tz: Tz) -> String {
    format!(
        "<b>Active subscriptions past their expiry ({})</b>\n\n{}",
        subscriptions.len(),
        subscription_lines(subscriptions, tz)
    )
}

fn disable_or_renew(subscription: &SubscriptionEntity) -> InlineKeyboard {
    InlineKeyboard::single_column(vec![
        SubscriptionAction::Disable(subscription.id).button(),
        SubscriptionAction::Renew(subscription.id).button(),
    ])
}

pub fn overdue_notice(subscription: &SubscriptionEntity, tz: Tz) -> Notice {
    Notice {
        text: format!(
            "⚠️ <b>{}</b>\nExpired on {}. Disable the client or extend the subscription.",
            escape_html(&subscription.client_name),
            format_date(subscription.expires_at, tz)
        ),
        keyboard: Some(disable_or_renew(subscription)),
    }
}

pub fn reminder_summary(
    subscriptions: &[SubscriptionEntity],
    threshold_hours: i64,
    tz: Tz,
) -> String {
    format!(
        "<b>Expired more than {threshold_hours}h ago and still not disabled ({})</b>\n\n{}",
        subscriptions.len(),
        subscription_lines(subscriptions, tz)
    )
}

pub fn reminder_notice(subscription: &SubscriptionEntity, now: DateTime<Utc>, tz: Tz) -> Notice {
    let hours = (now - subscription.expires_at).num_hours().max(0);
    Notice {
        text: format!(
            "🔔 <b>{}</b>\nExpired {hours}h ago ({}). The client still has access until disabled.",
            escape_html(&subscription.client_name),
            format_date(subscription.expires_at, tz)
        ),
        keyboard: Some(disable_or_renew(subscription)),
    }
}

pub fn order_completed(
    order: &PendingOrderEntity,
    tariff: &TariffEntity,
    credential: &ProvisionedCredential,
) -> Notice {
    let headline = if order.is_migration() {
        "✅ Payment received, subscription migrated"
    } else {
        "✅ Payment received, subscription created"
    };

    let mut text = format!(
        "{headline}\n\nClient: {}\nTariff: {} ({} days)\nLogin: <code>{}</code>",
        escape_html(&order.client_ref),
        escape_html(&tariff.name),
        tariff.duration_days,
        escape_html(&credential.generated_user_id)
    );
    if let Some(password) = &credential.server_password {
        let _ = write!(text, "\nPassword: <code>{}</code>", escape_html(password));
    }
    if let Some(url) = &credential.server_url {
        let _ = write!(text, "\nServer: {}", escape_html(url));
    }

    Notice::plain(text)
}

pub fn renewal_completed(
    subscription: &SubscriptionEntity,
    tariff: &TariffEntity,
    expires_at: DateTime<Utc>,
    tz: Tz,
) -> Notice {
    Notice::plain(format!(
        "✅ <b>{}</b>\nRenewed for {} days ({}). Active until {}.",
        escape_html(&subscription.client_name),
        tariff.duration_days,
        escape_html(&tariff.name),
        format_date(expires_at, tz)
    ))
}

pub fn disabled_confirmation(subscription: &SubscriptionEntity) -> Notice {
    Notice::plain(format!(
        "⛔ <b>{}</b>\nSubscription disabled.",
        escape_html(&subscription.client_name)
    ))
}

/// Replaces a notice that a later resolution made obsolete.
pub fn outdated() -> Notice {
    Notice::plain("ℹ️ This notice is outdated.".to_string())
}
