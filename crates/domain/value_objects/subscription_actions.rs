use std::fmt::Display;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::chat::InlineButton;

/// Affordances attached to addressable subscription notifications. The chat layer routes a
/// pressed button back through `SubscriptionAction::parse` whatever worker sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Renew(Uuid),
    RelinkPayment(Uuid),
    ChangeTariff(Uuid),
    Disable(Uuid),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackParseError {
    #[error("callback data is not of the form <action>:<subscription_id>: {0:?}")]
    Malformed(String),
    #[error("unknown subscription action: {0:?}")]
    UnknownAction(String),
    #[error("invalid subscription id in callback data: {0:?}")]
    InvalidId(String),
}

impl SubscriptionAction {
    pub fn subscription_id(&self) -> Uuid {
        match self {
            SubscriptionAction::Renew(id)
            | SubscriptionAction::RelinkPayment(id)
            | SubscriptionAction::ChangeTariff(id)
            | SubscriptionAction::Disable(id) => *id,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            SubscriptionAction::Renew(_) => "renew",
            SubscriptionAction::RelinkPayment(_) => "relink",
            SubscriptionAction::ChangeTariff(_) => "tariff",
            SubscriptionAction::Disable(_) => "disable",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionAction::Renew(_) => "Extend",
            SubscriptionAction::RelinkPayment(_) => "New payment link",
            SubscriptionAction::ChangeTariff(_) => "Change tariff",
            SubscriptionAction::Disable(_) => "Disable",
        }
    }

    pub fn callback_data(&self) -> String {
        self.to_string()
    }

    pub fn button(&self) -> InlineButton {
        InlineButton {
            text: self.label().to_string(),
            callback_data: self.callback_data(),
        }
    }

    pub fn parse(data: &str) -> Result<Self, CallbackParseError> {
        let (tag, raw_id) = data
            .split_once(':')
            .ok_or_else(|| CallbackParseError::Malformed(data.to_string()))?;
        let id =
            Uuid::parse_str(raw_id).map_err(|_| CallbackParseError::InvalidId(raw_id.to_string()))?;

        match tag {
            "renew" => Ok(SubscriptionAction::Renew(id)),
            "relink" => Ok(SubscriptionAction::RelinkPayment(id)),
            "tariff" => Ok(SubscriptionAction::ChangeTariff(id)),
            "disable" => Ok(SubscriptionAction::Disable(id)),
            other => Err(CallbackParseError::UnknownAction(other.to_string())),
        }
    }
}

impl Display for SubscriptionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tag(), self.subscription_id())
    }
}
