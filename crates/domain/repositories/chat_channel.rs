use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::chat::InlineKeyboard;

#[async_trait]
#[automock]
pub trait ChatChannel {
    /// Returns the id of the sent message.
    async fn send(&self, chat_id: i64, text: String, keyboard: Option<InlineKeyboard>)
    -> Result<i64>;

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        text: String,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()>;
}
