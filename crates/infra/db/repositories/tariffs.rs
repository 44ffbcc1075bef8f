use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::tariffs},
};
use domain::{entities::tariffs::TariffEntity, repositories::tariffs::TariffRepository};

pub struct TariffPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TariffPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TariffRepository for TariffPostgres {
    async fn find_by_id(&self, tariff_id: Uuid) -> Result<Option<TariffEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let tariff = tariffs::table
            .find(tariff_id)
            .select(TariffEntity::as_select())
            .first::<TariffEntity>(&mut conn)
            .optional()?;

        Ok(tariff)
    }
}
