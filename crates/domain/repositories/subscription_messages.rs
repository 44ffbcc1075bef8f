use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscription_messages::{
    InsertSubscriptionMessageEntity, SubscriptionMessageEntity,
};

#[async_trait]
#[automock]
pub trait SubscriptionMessageRepository {
    async fn insert(&self, message: InsertSubscriptionMessageEntity) -> Result<Uuid>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionMessageEntity>>;

    /// Active messages carrying a payment link, i.e. pending renewals.
    async fn list_active_with_payment(&self) -> Result<Vec<SubscriptionMessageEntity>>;

    async fn list_active_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionMessageEntity>>;

    async fn deactivate(&self, id: Uuid) -> Result<()>;

    async fn set_selected_tariff(&self, id: Uuid, tariff_id: Uuid) -> Result<()>;

    async fn set_payment(&self, id: Uuid, payment_id: Uuid) -> Result<()>;
}
