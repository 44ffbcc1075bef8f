pub mod payments;
pub mod pending_orders;
pub mod subscription_messages;
pub mod subscriptions;
pub mod tariffs;
