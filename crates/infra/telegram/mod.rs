pub mod bot_client;
