use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::tariffs;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = tariffs)]
pub struct TariffEntity {
    pub id: Uuid,
    pub name: String,
    pub duration_days: i32,
    pub price_minor: i64,
    pub is_active: bool,
}
