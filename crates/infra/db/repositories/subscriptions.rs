use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};
use domain::{
    entities::subscriptions::{SubscriptionEntity, SubscriptionRow},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        day_windows::DayWindow,
        enums::subscription_statuses::SubscriptionStatus,
        operators::{OperatorSubscriptions, group_by_operator},
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn into_entities(rows: Vec<SubscriptionRow>) -> Result<Vec<SubscriptionEntity>> {
    let subscriptions = rows
        .into_iter()
        .map(SubscriptionEntity::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subscriptions)
}

fn expirable_statuses() -> Vec<String> {
    SubscriptionStatus::EXPIRABLE
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = subscriptions::table
            .find(subscription_id)
            .select(SubscriptionRow::as_select())
            .first::<SubscriptionRow>(&mut conn)
            .optional()?;

        Ok(row.map(SubscriptionEntity::try_from).transpose()?)
    }

    async fn list_expiring_by_operator(
        &self,
        window: DayWindow,
    ) -> Result<Vec<OperatorSubscriptions>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .filter(subscriptions::expires_at.ge(window.from))
            .filter(subscriptions::expires_at.lt(window.to))
            .order((subscriptions::assistant_id.asc(), subscriptions::expires_at.asc()))
            .select(SubscriptionRow::as_select())
            .load::<SubscriptionRow>(&mut conn)?;

        Ok(group_by_operator(into_entities(rows)?))
    }

    async fn list_overdue_by_operator(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OperatorSubscriptions>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .filter(subscriptions::expires_at.lt(now))
            .order((subscriptions::assistant_id.asc(), subscriptions::expires_at.asc()))
            .select(SubscriptionRow::as_select())
            .load::<SubscriptionRow>(&mut conn)?;

        Ok(group_by_operator(into_entities(rows)?))
    }

    async fn list_expirable(&self, now: DateTime<Utc>) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscriptions::table
            .filter(subscriptions::status.eq_any(expirable_statuses()))
            .filter(subscriptions::expires_at.lt(now))
            .order(subscriptions::expires_at.asc())
            .select(SubscriptionRow::as_select())
            .load::<SubscriptionRow>(&mut conn)?;

        into_entities(rows)
    }

    async fn list_stale_expired_by_operator(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<OperatorSubscriptions>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscriptions::table
            .filter(subscriptions::status.eq(SubscriptionStatus::Expired.to_string()))
            .filter(subscriptions::expires_at.lt(cutoff))
            .order((subscriptions::assistant_id.asc(), subscriptions::expires_at.asc()))
            .select(SubscriptionRow::as_select())
            .load::<SubscriptionRow>(&mut conn)?;

        Ok(group_by_operator(into_entities(rows)?))
    }

    async fn mark_expired(&self, subscription_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(subscriptions::table.find(subscription_id))
            .filter(subscriptions::status.eq_any(expirable_statuses()))
            .filter(subscriptions::expires_at.lt(now))
            .set(subscriptions::status.eq(SubscriptionStatus::Expired.to_string()))
            .execute(&mut conn)?;

        Ok(affected == 1)
    }

    async fn renew(
        &self,
        subscription_id: Uuid,
        tariff_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(subscriptions::table.find(subscription_id))
            .set((
                subscriptions::tariff_id.eq(tariff_id),
                subscriptions::expires_at.eq(expires_at),
                subscriptions::status.eq(SubscriptionStatus::Active.to_string()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_tariff(&self, subscription_id: Uuid, tariff_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(subscriptions::table.find(subscription_id))
            .set(subscriptions::tariff_id.eq(tariff_id))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_disabled(
        &self,
        subscription_id: Uuid,
        seen_status: SubscriptionStatus,
        seen_expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(subscriptions::table.find(subscription_id))
            .filter(subscriptions::status.eq(seen_status.to_string()))
            .filter(subscriptions::status.ne(SubscriptionStatus::Disabled.to_string()))
            .filter(subscriptions::expires_at.eq(seen_expires_at))
            .set(subscriptions::status.eq(SubscriptionStatus::Disabled.to_string()))
            .execute(&mut conn)?;

        Ok(affected == 1)
    }
}
