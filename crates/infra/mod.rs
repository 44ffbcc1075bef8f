pub mod db;
pub mod provisioning;
pub mod telegram;
