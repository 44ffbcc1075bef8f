use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the provisioning service needs to create or migrate a subscription.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionIntent {
    pub order_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub admin_id: i64,
    pub assistant_id: i64,
    pub client_ref: String,
    pub tariff_id: Uuid,
    pub duration_days: i32,
    pub server_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProvisionedCredential {
    pub generated_user_id: String,
    pub server_url: Option<String>,
    pub server_password: Option<String>,
}
