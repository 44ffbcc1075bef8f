use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::tariffs::TariffEntity;

#[async_trait]
#[automock]
pub trait TariffRepository {
    async fn find_by_id(&self, tariff_id: Uuid) -> Result<Option<TariffEntity>>;
}
