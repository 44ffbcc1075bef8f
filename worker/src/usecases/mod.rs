pub mod disable_reminders;
pub mod expiration_sweep;
pub mod message_actions;
pub mod message_activity;
pub mod notifications;
pub mod order_actions;
pub mod reconcile_payments;

use serde::Serialize;
use std::sync::Arc;
use vpnbot::domain::repositories::{
    payments::PaymentRepository, pending_orders::PendingOrderRepository,
    subscription_messages::SubscriptionMessageRepository, subscriptions::SubscriptionRepository,
    tariffs::TariffRepository,
};

pub use disable_reminders::ReminderReport;
pub use expiration_sweep::ExpirationReport;
pub use reconcile_payments::ReconcileReport;

/// The persistent stores every worker reads and writes.
#[derive(Clone)]
pub struct Stores {
    pub subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
    pub messages: Arc<dyn SubscriptionMessageRepository + Send + Sync>,
    pub orders: Arc<dyn PendingOrderRepository + Send + Sync>,
    pub payments: Arc<dyn PaymentRepository + Send + Sync>,
    pub tariffs: Arc<dyn TariffRepository + Send + Sync>,
}

/// Outcome of one worker run, as logged by the scheduler and returned by the manual trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "worker", rename_all = "snake_case")]
pub enum JobReport {
    Reconciliation(ReconcileReport),
    Expiration(ExpirationReport),
    DisableReminder(ReminderReport),
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_report_is_tagged_with_worker_name() {
        let report = JobReport::Reconciliation(ReconcileReport {
            applied: 2,
            failed: 1,
            ..Default::default()
        });

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["worker"], "reconciliation");
        assert_eq!(json["applied"], 2);
        assert_eq!(json["failed"], 1);
    }
}
