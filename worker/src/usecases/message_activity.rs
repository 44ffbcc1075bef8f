use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use vpnbot::domain::{
    entities::{
        subscription_messages::{InsertSubscriptionMessageEntity, SubscriptionMessageEntity},
        subscriptions::SubscriptionEntity,
    },
    repositories::{
        chat_channel::ChatChannel, subscription_messages::SubscriptionMessageRepository,
    },
    value_objects::{
        enums::message_types::SubscriptionMessageType, operators::OperatorSubscriptions,
    },
};

use super::notifications::{self, Notice};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub sent: usize,
    pub failed: usize,
}

/// Keeps chat messages and their `SubscriptionMessage` records in step: every addressable
/// notice gets a record, and a resolution retires all the others.
#[derive(Clone)]
pub struct MessageActivity {
    messages: Arc<dyn SubscriptionMessageRepository + Send + Sync>,
    chat: Arc<dyn ChatChannel + Send + Sync>,
}

impl MessageActivity {
    pub fn new(
        messages: Arc<dyn SubscriptionMessageRepository + Send + Sync>,
        chat: Arc<dyn ChatChannel + Send + Sync>,
    ) -> Self {
        Self { messages, chat }
    }

    /// The record is written only after the chat accepted the message, so a failed send
    /// leaves nothing behind that could later be outdated or acted on. The new notice then
    /// supersedes the subscription's older live ones.
    pub async fn send_tracked(
        &self,
        chat_id: i64,
        subscription_id: Uuid,
        type_: SubscriptionMessageType,
        notice: Notice,
    ) -> Result<Uuid> {
        let message_id = self
            .chat
            .send(chat_id, notice.text, notice.keyboard)
            .await
            .with_context(|| format!("failed to send {type_} notice for {subscription_id}"))?;

        let record_id = self
            .messages
            .insert(InsertSubscriptionMessageEntity::active(
                subscription_id,
                chat_id,
                message_id,
                type_,
            ))
            .await
            .with_context(|| {
                format!("sent {type_} notice {message_id} for {subscription_id} but could not record it")
            })?;

        if let Err(err) = self.retire_superseded(subscription_id, record_id).await {
            warn!(
                %subscription_id,
                message_id = %record_id,
                error = ?err,
                "message_activity: failed to retire superseded notices"
            );
        }

        Ok(record_id)
    }

    /// Outdates the subscription's other live notices. Messages with a linked payment stay
    /// active so the renewal they carry still reaches reconciliation.
    async fn retire_superseded(&self, subscription_id: Uuid, current: Uuid) -> Result<usize> {
        let stale = self
            .messages
            .list_active_for_subscription(subscription_id)
            .await?
            .into_iter()
            .filter(|m| m.id != current && m.payment_id.is_none())
            .collect();

        Ok(self.outdate(subscription_id, stale).await)
    }

    /// One summary plus one tracked notice per subscription, all to the operator's chat.
    /// A failed summary does not stop the per-subscription notices.
    pub async fn notify_operator<F>(
        &self,
        group: &OperatorSubscriptions,
        summary: String,
        type_: SubscriptionMessageType,
        notice_for: F,
    ) -> NotifyOutcome
    where
        F: Fn(&SubscriptionEntity) -> Notice,
    {
        let mut outcome = NotifyOutcome::default();

        if let Err(err) = self.chat.send(group.operator_id, summary, None).await {
            warn!(
                operator_id = group.operator_id,
                message_type = %type_,
                error = ?err,
                "message_activity: summary not delivered"
            );
        }

        for subscription in &group.subscriptions {
            match self
                .send_tracked(
                    group.operator_id,
                    subscription.id,
                    type_,
                    notice_for(subscription),
                )
                .await
            {
                Ok(_) => outcome.sent += 1,
                Err(err) => {
                    outcome.failed += 1;
                    warn!(
                        operator_id = group.operator_id,
                        subscription_id = %subscription.id,
                        message_type = %type_,
                        error = ?err,
                        "message_activity: notice not delivered"
                    );
                }
            }
        }

        outcome
    }

    /// Deactivates every active message of the subscription except `keep` and edits each
    /// one to the outdated text. Returns how many records were deactivated.
    pub async fn outdate_siblings(&self, subscription_id: Uuid, keep: Option<Uuid>) -> Result<usize> {
        let siblings = self
            .messages
            .list_active_for_subscription(subscription_id)
            .await?
            .into_iter()
            .filter(|m| Some(m.id) != keep)
            .collect();

        Ok(self.outdate(subscription_id, siblings).await)
    }

    async fn outdate(&self, subscription_id: Uuid, stale: Vec<SubscriptionMessageEntity>) -> usize {
        let mut outdated = 0;
        for message in stale {
            if let Err(err) = self.messages.deactivate(message.id).await {
                warn!(
                    message_id = %message.id,
                    %subscription_id,
                    error = ?err,
                    "message_activity: failed to deactivate message"
                );
                continue;
            }
            outdated += 1;

            let notice = notifications::outdated();
            if let Err(err) = self
                .chat
                .edit(message.chat_id, message.message_id, notice.text, notice.keyboard)
                .await
            {
                warn!(
                    chat_id = message.chat_id,
                    chat_message_id = message.message_id,
                    error = ?err,
                    "message_activity: failed to mark message outdated in chat"
                );
            }
        }

        if outdated > 0 {
            info!(%subscription_id, outdated, "message_activity: messages outdated");
        }
        outdated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support;
    use anyhow::anyhow;
    use chrono::Utc;
    use mockall::predicate::eq;
    use vpnbot::domain::{
        repositories::{
            chat_channel::MockChatChannel,
            subscription_messages::MockSubscriptionMessageRepository,
        },
        value_objects::enums::subscription_statuses::SubscriptionStatus,
    };

    fn message(subscription_id: Uuid, message_id: i64) -> SubscriptionMessageEntity {
        SubscriptionMessageEntity {
            id: Uuid::new_v4(),
            subscription_id,
            chat_id: 77,
            message_id,
            type_: SubscriptionMessageType::Expiring,
            is_active: true,
            selected_tariff_id: None,
            payment_id: None,
        }
    }

    #[tokio::test]
    async fn send_tracked_records_message_after_send() {
        let subscription_id = Uuid::new_v4();
        let record_id = Uuid::new_v4();

        let mut chat = MockChatChannel::new();
        chat.expect_send()
            .withf(|chat_id, _, keyboard| *chat_id == 77 && keyboard.is_none())
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(501) }));

        let mut messages = MockSubscriptionMessageRepository::new();
        messages
            .expect_insert()
            .withf(move |m| {
                m.subscription_id == subscription_id
                    && m.chat_id == 77
                    && m.message_id == 501
                    && m.type_ == "overdue"
                    && m.is_active
            })
            .times(1)
            .returning(move |_| Box::pin(async move { Ok(record_id) }));
        messages
            .expect_list_active_for_subscription()
            .with(eq(subscription_id))
            .times(1)
            .returning(|_| Box::pin(async { Ok(Vec::new()) }));

        let activity = MessageActivity::new(Arc::new(messages), Arc::new(chat));
        let id = activity
            .send_tracked(
                77,
                subscription_id,
                SubscriptionMessageType::Overdue,
                notifications::outdated(),
            )
            .await
            .unwrap();

        assert_eq!(id, record_id);
    }

    #[tokio::test]
    async fn failed_send_records_nothing() {
        let mut chat = MockChatChannel::new();
        chat.expect_send()
            .returning(|_, _, _| Box::pin(async { Err(anyhow!("telegram down")) }));
        let messages = MockSubscriptionMessageRepository::new();

        let activity = MessageActivity::new(Arc::new(messages), Arc::new(chat));
        let result = activity
            .send_tracked(
                77,
                Uuid::new_v4(),
                SubscriptionMessageType::Expiring,
                notifications::outdated(),
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn outdate_siblings_skips_the_resolving_message_and_survives_edit_failures() {
        let subscription_id = Uuid::new_v4();
        let keep = message(subscription_id, 1);
        let first = message(subscription_id, 2);
        let second = message(subscription_id, 3);
        let keep_id = keep.id;
        let listed = vec![keep.clone(), first.clone(), second.clone()];

        let mut messages = MockSubscriptionMessageRepository::new();
        messages
            .expect_list_active_for_subscription()
            .with(eq(subscription_id))
            .returning(move |_| {
                let listed = listed.clone();
                Box::pin(async move { Ok(listed) })
            });
        messages
            .expect_deactivate()
            .withf(move |id| *id != keep_id)
            .times(2)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut chat = MockChatChannel::new();
        chat.expect_edit()
            .with(eq(77), eq(2), mockall::predicate::always(), eq(None))
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Err(anyhow!("message to edit not found")) }));
        chat.expect_edit()
            .with(eq(77), eq(3), mockall::predicate::always(), eq(None))
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let activity = MessageActivity::new(Arc::new(messages), Arc::new(chat));
        let outdated = activity
            .outdate_siblings(subscription_id, Some(keep_id))
            .await
            .unwrap();

        assert_eq!(outdated, 2);
    }

    #[tokio::test]
    async fn notify_operator_sends_notices_even_if_summary_fails() {
        let subs = vec![
            test_support::subscription(42, "ann", SubscriptionStatus::Active, Utc::now()),
            test_support::subscription(42, "bob", SubscriptionStatus::Active, Utc::now()),
        ];
        let group = OperatorSubscriptions {
            operator_id: 42,
            subscriptions: subs,
        };

        let mut chat = MockChatChannel::new();
        chat.expect_send()
            .withf(|_, _, keyboard| keyboard.is_none())
            .times(1)
            .returning(|_, _, _| Box::pin(async { Err(anyhow!("flood wait")) }));
        chat.expect_send()
            .withf(|chat_id, _, keyboard| *chat_id == 42 && keyboard.is_some())
            .times(2)
            .returning(|_, _, _| Box::pin(async { Ok(9) }));

        let mut messages = MockSubscriptionMessageRepository::new();
        messages
            .expect_insert()
            .times(2)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));
        messages
            .expect_list_active_for_subscription()
            .times(2)
            .returning(|_| Box::pin(async { Ok(Vec::new()) }));

        let activity = MessageActivity::new(Arc::new(messages), Arc::new(chat));
        let outcome = activity
            .notify_operator(
                &group,
                "summary".to_string(),
                SubscriptionMessageType::Expiring,
                |s| notifications::expiring_notice(s, 0, chrono_tz::UTC),
            )
            .await;

        assert_eq!(outcome, NotifyOutcome { sent: 2, failed: 0 });
    }

    #[tokio::test]
    async fn new_notice_supersedes_older_ones_but_spares_pending_payment() {
        let subscription_id = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let older = message(subscription_id, 4);
        let older_id = older.id;
        let paying = SubscriptionMessageEntity {
            payment_id: Some(Uuid::new_v4()),
            ..message(subscription_id, 5)
        };
        let fresh = SubscriptionMessageEntity {
            id: record_id,
            ..message(subscription_id, 6)
        };
        let listed = vec![older, paying, fresh];

        let mut messages = MockSubscriptionMessageRepository::new();
        messages
            .expect_insert()
            .times(1)
            .returning(move |_| Box::pin(async move { Ok(record_id) }));
        messages
            .expect_list_active_for_subscription()
            .with(eq(subscription_id))
            .returning(move |_| {
                let listed = listed.clone();
                Box::pin(async move { Ok(listed) })
            });
        messages
            .expect_deactivate()
            .with(eq(older_id))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut chat = MockChatChannel::new();
        chat.expect_send()
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(6) }));
        chat.expect_edit()
            .with(eq(77), eq(4), mockall::predicate::always(), eq(None))
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let activity = MessageActivity::new(Arc::new(messages), Arc::new(chat));
        let id = activity
            .send_tracked(
                77,
                subscription_id,
                SubscriptionMessageType::Overdue,
                notifications::outdated(),
            )
            .await
            .unwrap();

        assert_eq!(id, record_id);
    }

    #[tokio::test]
    async fn failing_to_retire_older_notices_keeps_the_new_one() {
        let record_id = Uuid::new_v4();

        let mut messages = MockSubscriptionMessageRepository::new();
        messages
            .expect_insert()
            .returning(move |_| Box::pin(async move { Ok(record_id) }));
        messages
            .expect_list_active_for_subscription()
            .returning(|_| Box::pin(async { Err(anyhow!("connection reset")) }));

        let mut chat = MockChatChannel::new();
        chat.expect_send()
            .returning(|_, _, _| Box::pin(async { Ok(6) }));

        let activity = MessageActivity::new(Arc::new(messages), Arc::new(chat));
        let result = activity
            .send_tracked(
                77,
                Uuid::new_v4(),
                SubscriptionMessageType::Expiring,
                notifications::outdated(),
            )
            .await;

        assert_eq!(result.unwrap(), record_id);
    }
}
