use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    UnknownStatus, subscription_statuses::SubscriptionStatus,
};
use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub client_name: String,
    /// Operator responsible for the client; also the operator's private chat id.
    pub assistant_id: i64,
    pub tariff_id: Uuid,
    pub server_id: Option<Uuid>,
    pub status: SubscriptionStatus,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub generated_user_id: Option<String>,
}

impl SubscriptionEntity {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// The worker may move this subscription to `expired` at `now`.
    pub fn should_expire(&self, now: DateTime<Utc>) -> bool {
        self.status.can_expire() && self.is_past_expiry(now)
    }
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub client_name: String,
    pub assistant_id: i64,
    pub tariff_id: Uuid,
    pub server_id: Option<Uuid>,
    pub status: String,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub generated_user_id: Option<String>,
}

impl TryFrom<SubscriptionRow> for SubscriptionEntity {
    type Error = UnknownStatus;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            client_name: row.client_name,
            assistant_id: row.assistant_id,
            tariff_id: row.tariff_id,
            server_id: row.server_id,
            status: row.status.parse()?,
            activated_at: row.activated_at,
            expires_at: row.expires_at,
            generated_user_id: row.generated_user_id,
        })
    }
}
