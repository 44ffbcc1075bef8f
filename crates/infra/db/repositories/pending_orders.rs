use anyhow::Result;
use async_trait::async_trait;
use diesel::{delete, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::pending_orders},
};
use domain::{
    entities::pending_orders::{PendingOrderEntity, PendingOrderRow},
    repositories::pending_orders::PendingOrderRepository,
};

pub struct PendingOrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PendingOrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PendingOrderRepository for PendingOrderPostgres {
    async fn list_with_payment(&self) -> Result<Vec<PendingOrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = pending_orders::table
            .filter(pending_orders::payment_id.is_not_null())
            .order(pending_orders::created_at.asc())
            .select(PendingOrderRow::as_select())
            .load::<PendingOrderRow>(&mut conn)?;

        let orders = rows
            .into_iter()
            .map(PendingOrderEntity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<PendingOrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = pending_orders::table
            .find(order_id)
            .select(PendingOrderRow::as_select())
            .first::<PendingOrderRow>(&mut conn)
            .optional()?;

        Ok(row.map(PendingOrderEntity::try_from).transpose()?)
    }

    async fn delete(&self, order_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        delete(pending_orders::table.find(order_id)).execute(&mut conn)?;

        Ok(())
    }

    async fn update_payment(&self, order_id: Uuid, payment_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(pending_orders::table.find(order_id))
            .set(pending_orders::payment_id.eq(Some(payment_id)))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_message(&self, order_id: Uuid, message_id: i64) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(pending_orders::table.find(order_id))
            .set(pending_orders::message_id.eq(Some(message_id)))
            .execute(&mut conn)?;

        Ok(())
    }
}
