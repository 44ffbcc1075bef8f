pub mod auth;
pub mod pending_orders;
pub mod subscription_messages;
pub mod workers;
