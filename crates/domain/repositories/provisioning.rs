use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::provisioning::{ProvisionedCredential, SubscriptionIntent};

#[async_trait]
#[automock]
pub trait ProvisioningService {
    async fn create_subscription(&self, intent: SubscriptionIntent)
    -> Result<ProvisionedCredential>;

    async fn migrate_subscription(
        &self,
        intent: SubscriptionIntent,
    ) -> Result<ProvisionedCredential>;

    async fn extend_subscription(&self, subscription_id: Uuid, days: i32) -> Result<()>;
}
