use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::{
    UnknownStatus, message_types::SubscriptionMessageType,
};
use crate::infra::db::postgres::schema::subscription_messages;

/// A chat message bound to one subscription; the addressable surface for renew/disable.
/// Its liveness (`is_active`) is tracked apart from the subscription's own status.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionMessageEntity {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub chat_id: i64,
    pub message_id: i64,
    pub type_: SubscriptionMessageType,
    pub is_active: bool,
    pub selected_tariff_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscription_messages)]
pub struct SubscriptionMessageRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub chat_id: i64,
    pub message_id: i64,
    pub type_: String,
    pub is_active: bool,
    pub selected_tariff_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionMessageRow> for SubscriptionMessageEntity {
    type Error = UnknownStatus;

    fn try_from(row: SubscriptionMessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            subscription_id: row.subscription_id,
            chat_id: row.chat_id,
            message_id: row.message_id,
            type_: row.type_.parse()?,
            is_active: row.is_active,
            selected_tariff_id: row.selected_tariff_id,
            payment_id: row.payment_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = subscription_messages)]
pub struct InsertSubscriptionMessageEntity {
    pub subscription_id: Uuid,
    pub chat_id: i64,
    pub message_id: i64,
    pub type_: String,
    pub is_active: bool,
    pub selected_tariff_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
}

impl InsertSubscriptionMessageEntity {
    pub fn active(
        subscription_id: Uuid,
        chat_id: i64,
        message_id: i64,
        type_: SubscriptionMessageType,
    ) -> Self {
        Self {
            subscription_id,
            chat_id,
            message_id,
            type_: type_.to_string(),
            is_active: true,
            selected_tariff_id: None,
            payment_id: None,
        }
    }
}
