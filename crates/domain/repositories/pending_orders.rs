use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::pending_orders::PendingOrderEntity;

#[async_trait]
#[automock]
pub trait PendingOrderRepository {
    /// Orders with a linked payment, i.e. the ones the reconciliation worker polls.
    async fn list_with_payment(&self) -> Result<Vec<PendingOrderEntity>>;

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<PendingOrderEntity>>;

    /// Consumes the order. Once this returns no later poll can observe it.
    async fn delete(&self, order_id: Uuid) -> Result<()>;

    async fn update_payment(&self, order_id: Uuid, payment_id: Uuid) -> Result<()>;

    async fn update_message(&self, order_id: Uuid, message_id: i64) -> Result<()>;
}
