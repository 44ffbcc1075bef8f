use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use super::UnknownStatus;

/// `pending -> active -> expired -> disabled`, with `active` reachable again from
/// `expired` or `disabled` through a paid renewal.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Pending,
    Active,
    Expired,
    Disabled,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Disabled => "disabled",
        };
        write!(f, "{}", status)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "disabled" => Ok(SubscriptionStatus::Disabled),
            _ => Err(UnknownStatus::new("subscription", value)),
        }
    }
}

impl SubscriptionStatus {
    /// Statuses the daily sweep moves to `expired` once `expires_at` has passed.
    pub const EXPIRABLE: [SubscriptionStatus; 2] =
        [SubscriptionStatus::Active, SubscriptionStatus::Pending];

    /// Whether the worker-driven, time-only transition to `expired` applies.
    pub fn can_expire(&self) -> bool {
        Self::EXPIRABLE.contains(self)
    }

    /// Disabling is operator-only and never applies to a subscription that is already off.
    pub fn can_disable(&self) -> bool {
        !matches!(self, SubscriptionStatus::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_column_text() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Disabled,
        ] {
            assert_eq!(status.to_string().parse::<SubscriptionStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_column_value_is_rejected() {
        assert!("past_due".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn only_active_and_pending_expire() {
        assert!(SubscriptionStatus::Active.can_expire());
        assert!(SubscriptionStatus::Pending.can_expire());
        assert!(!SubscriptionStatus::Expired.can_expire());
        assert!(!SubscriptionStatus::Disabled.can_expire());
    }
}
