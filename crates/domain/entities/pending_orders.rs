use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::{UnknownStatus, payment_statuses::PaymentStatus};
use crate::infra::db::postgres::schema::pending_orders;

/// Payment-gated intent to create or migrate a subscription. Holds everything needed to
/// finish the job after the chat session that created it is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrderEntity {
    pub id: Uuid,
    pub payment_id: Option<Uuid>,
    pub admin_id: i64,
    pub assistant_id: i64,
    pub chat_id: i64,
    pub message_id: Option<i64>,
    pub client_ref: String,
    pub tariff_id: Uuid,
    /// Present only for migrations to another server.
    pub server_id: Option<Uuid>,
    pub amount_minor: i64,
    pub status: PaymentStatus,
}

impl PendingOrderEntity {
    pub fn is_migration(&self) -> bool {
        self.server_id.is_some()
    }
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = pending_orders)]
pub struct PendingOrderRow {
    pub id: Uuid,
    pub payment_id: Option<Uuid>,
    pub admin_id: i64,
    pub assistant_id: i64,
    pub chat_id: i64,
    pub message_id: Option<i64>,
    pub client_ref: String,
    pub tariff_id: Uuid,
    pub server_id: Option<Uuid>,
    pub amount_minor: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PendingOrderRow> for PendingOrderEntity {
    type Error = UnknownStatus;

    fn try_from(row: PendingOrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            payment_id: row.payment_id,
            admin_id: row.admin_id,
            assistant_id: row.assistant_id,
            chat_id: row.chat_id,
            message_id: row.message_id,
            client_ref: row.client_ref,
            tariff_id: row.tariff_id,
            server_id: row.server_id,
            amount_minor: row.amount_minor,
            status: row.status.parse()?,
        })
    }
}
