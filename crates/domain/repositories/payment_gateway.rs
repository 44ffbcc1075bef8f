use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::enums::payment_statuses::PaymentStatus;

/// Asynchronous, eventually-consistent source of payment status. Polled, never pushed.
#[async_trait]
#[automock]
pub trait PaymentGateway {
    async fn check_status(&self, gateway_ref: String) -> Result<PaymentStatus>;
}
