pub mod chat;
pub mod day_windows;
pub mod enums;
pub mod operators;
pub mod provisioning;
pub mod subscription_actions;
