use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use super::UnknownStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Approved, rejected and cancelled payments never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
            _ => Err(UnknownStatus::new("payment", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses_case_insensitively() {
        assert_eq!("Approved".parse::<PaymentStatus>(), Ok(PaymentStatus::Approved));
        assert_eq!(" pending ".parse::<PaymentStatus>(), Ok(PaymentStatus::Pending));
        assert_eq!("canceled".parse::<PaymentStatus>(), Ok(PaymentStatus::Cancelled));
    }

    #[test]
    fn unknown_status_is_an_error_not_pending() {
        let err = "waiting_for_capture".parse::<PaymentStatus>().unwrap_err();
        assert_eq!(err.kind, "payment");
        assert_eq!(err.value, "waiting_for_capture");
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Approved.is_terminal());
        assert!(PaymentStatus::Rejected.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
    }
}
