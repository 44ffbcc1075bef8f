use anyhow::Result;
use async_trait::async_trait;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscription_messages},
};
use domain::{
    entities::subscription_messages::{
        InsertSubscriptionMessageEntity, SubscriptionMessageEntity, SubscriptionMessageRow,
    },
    repositories::subscription_messages::SubscriptionMessageRepository,
};

pub struct SubscriptionMessagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionMessagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn into_entities(rows: Vec<SubscriptionMessageRow>) -> Result<Vec<SubscriptionMessageEntity>> {
    let messages = rows
        .into_iter()
        .map(SubscriptionMessageEntity::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

#[async_trait]
impl SubscriptionMessageRepository for SubscriptionMessagePostgres {
    async fn insert(&self, message: InsertSubscriptionMessageEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let id = insert_into(subscription_messages::table)
            .values(&message)
            .returning(subscription_messages::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(id)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionMessageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = subscription_messages::table
            .find(id)
            .select(SubscriptionMessageRow::as_select())
            .first::<SubscriptionMessageRow>(&mut conn)
            .optional()?;

        Ok(row.map(SubscriptionMessageEntity::try_from).transpose()?)
    }

    async fn list_active_with_payment(&self) -> Result<Vec<SubscriptionMessageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscription_messages::table
            .filter(subscription_messages::is_active.eq(true))
            .filter(subscription_messages::payment_id.is_not_null())
            .order(subscription_messages::created_at.asc())
            .select(SubscriptionMessageRow::as_select())
            .load::<SubscriptionMessageRow>(&mut conn)?;

        into_entities(rows)
    }

    async fn list_active_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Vec<SubscriptionMessageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscription_messages::table
            .filter(subscription_messages::subscription_id.eq(subscription_id))
            .filter(subscription_messages::is_active.eq(true))
            .order(subscription_messages::created_at.asc())
            .select(SubscriptionMessageRow::as_select())
            .load::<SubscriptionMessageRow>(&mut conn)?;

        into_entities(rows)
    }

    async fn deactivate(&self, id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(subscription_messages::table.find(id))
            .set(subscription_messages::is_active.eq(false))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn set_selected_tariff(&self, id: Uuid, tariff_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(subscription_messages::table.find(id))
            .set(subscription_messages::selected_tariff_id.eq(Some(tariff_id)))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn set_payment(&self, id: Uuid, payment_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(subscription_messages::table.find(id))
            .set(subscription_messages::payment_id.eq(Some(payment_id)))
            .execute(&mut conn)?;

        Ok(())
    }
}
