use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMessageType {
    Expiring,
    Overdue,
}

impl SubscriptionMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionMessageType::Expiring => "expiring",
            SubscriptionMessageType::Overdue => "overdue",
        }
    }
}

impl Display for SubscriptionMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionMessageType {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "expiring" => Ok(SubscriptionMessageType::Expiring),
            "overdue" => Ok(SubscriptionMessageType::Overdue),
            _ => Err(UnknownStatus::new("subscription message type", value)),
        }
    }
}
