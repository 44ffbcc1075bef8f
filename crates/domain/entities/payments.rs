use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::{UnknownStatus, payment_statuses::PaymentStatus};
use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub owner_id: i64,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    pub gateway_ref: String,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentRow {
    pub id: Uuid,
    pub owner_id: i64,
    pub amount_minor: i64,
    pub status: String,
    pub gateway_ref: String,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for PaymentEntity {
    type Error = UnknownStatus;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            amount_minor: row.amount_minor,
            status: row.status.parse()?,
            gateway_ref: row.gateway_ref,
            processed_at: row.processed_at,
        })
    }
}
