pub mod chat_channel;
pub mod payment_gateway;
pub mod payments;
pub mod pending_orders;
pub mod provisioning;
pub mod subscription_messages;
pub mod subscriptions;
pub mod tariffs;
