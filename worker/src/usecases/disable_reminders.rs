use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use vpnbot::domain::{
    repositories::chat_channel::ChatChannel,
    value_objects::enums::message_types::SubscriptionMessageType,
};

use super::{JobReport, Stores, message_activity::MessageActivity, notifications};
use crate::scheduler::Job;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub operators: usize,
    pub reminded: usize,
    pub failed: usize,
}

/// Nags operators about subscriptions that have sat in `expired` longer than the threshold
/// without being disabled. Reminders reuse the overdue notice contract.
pub struct DisableReminderUseCase {
    stores: Stores,
    activity: MessageActivity,
    threshold: Duration,
    tz: Tz,
}

impl DisableReminderUseCase {
    pub fn new(
        stores: Stores,
        chat: Arc<dyn ChatChannel + Send + Sync>,
        threshold_hours: i64,
        tz: Tz,
    ) -> Self {
        let activity = MessageActivity::new(Arc::clone(&stores.messages), chat);
        Self {
            stores,
            activity,
            threshold: Duration::hours(threshold_hours),
            tz,
        }
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ReminderReport> {
        let cutoff = now - self.threshold;
        let groups = self
            .stores
            .subscriptions
            .list_stale_expired_by_operator(cutoff)
            .await
            .inspect_err(|err| {
                error!(error = ?err, %cutoff, "disable_reminder: failed to list stale subscriptions")
            })?;

        let mut report = ReminderReport {
            operators: groups.len(),
            ..Default::default()
        };

        for group in groups {
            let summary = notifications::reminder_summary(
                &group.subscriptions,
                self.threshold.num_hours(),
                self.tz,
            );
            let outcome = self
                .activity
                .notify_operator(&group, summary, SubscriptionMessageType::Overdue, |s| {
                    notifications::reminder_notice(s, now, self.tz)
                })
                .await;
            report.reminded += outcome.sent;
            report.failed += outcome.failed;
        }

        if report.operators > 0 {
            info!(?report, "disable_reminder: reminders sent");
        }
        Ok(report)
    }
}

#[async_trait]
impl Job for DisableReminderUseCase {
    fn name(&self) -> &'static str {
        "disable_reminder"
    }

    async fn run(&self) -> Result<JobReport> {
        Ok(JobReport::DisableReminder(self.run_at(Utc::now()).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{self, MockStores};
    use anyhow::anyhow;
    use chrono::TimeZone;
    use mockall::predicate::eq;
    use uuid::Uuid;
    use std::sync::{
        Mutex,
        atomic::{AtomicI64, Ordering},
    };
    use vpnbot::domain::{
        entities::subscription_messages::SubscriptionMessageEntity,
        repositories::chat_channel::MockChatChannel,
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus, operators::OperatorSubscriptions,
        },
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn reminders(stores: MockStores, chat: MockChatChannel) -> DisableReminderUseCase {
        DisableReminderUseCase::new(stores.build(), Arc::new(chat), 24, chrono_tz::UTC)
    }

    #[tokio::test]
    async fn stale_expired_subscription_gets_disable_reminder() {
        let stale = test_support::subscription(
            42,
            "ann",
            SubscriptionStatus::Expired,
            now() - Duration::hours(30),
        );
        let stale_id = stale.id;
        let group = OperatorSubscriptions {
            operator_id: 42,
            subscriptions: vec![stale],
        };

        let mut stores = MockStores::new();
        stores
            .subscriptions
            .expect_list_stale_expired_by_operator()
            .with(eq(now() - Duration::hours(24)))
            .times(1)
            .returning(move |_| {
                let group = group.clone();
                Box::pin(async move { Ok(vec![group]) })
            });
        stores
            .messages
            .expect_insert()
            .withf(move |m| m.subscription_id == stale_id && m.type_ == "overdue")
            .times(1)
            .returning(|_| Box::pin(async { Ok(Uuid::new_v4()) }));
        stores
            .messages
            .expect_list_active_for_subscription()
            .with(eq(stale_id))
            .returning(|_| Box::pin(async { Ok(Vec::new()) }));

        let mut chat = MockChatChannel::new();
        chat.expect_send()
            .withf(|_, text, keyboard| keyboard.is_none() && text.contains("more than 24h"))
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(1) }));
        chat.expect_send()
            .withf(move |_, text, keyboard| {
                text.contains("30h ago")
                    && keyboard.as_ref().is_some_and(|k| {
                        k.inline_keyboard[0][0].callback_data == format!("disable:{stale_id}")
                    })
            })
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(2) }));

        let report = reminders(stores, chat).run_at(now()).await.unwrap();

        assert_eq!(
            report,
            ReminderReport {
                operators: 1,
                reminded: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn hourly_reminders_leave_one_live_reminder_per_subscription() {
        let stale = test_support::subscription(
            42,
            "ann",
            SubscriptionStatus::Expired,
            now() - Duration::hours(30),
        );
        let stale_id = stale.id;
        let group = OperatorSubscriptions {
            operator_id: 42,
            subscriptions: vec![stale],
        };
        let records: Arc<Mutex<Vec<SubscriptionMessageEntity>>> = Arc::default();

        let mut stores = MockStores::new();
        stores
            .subscriptions
            .expect_list_stale_expired_by_operator()
            .times(2)
            .returning(move |_| {
                let group = group.clone();
                Box::pin(async move { Ok(vec![group]) })
            });
        let inserted = Arc::clone(&records);
        stores.messages.expect_insert().returning(move |m| {
            let id = Uuid::new_v4();
            inserted.lock().unwrap().push(SubscriptionMessageEntity {
                id,
                subscription_id: m.subscription_id,
                chat_id: m.chat_id,
                message_id: m.message_id,
                type_: m.type_.parse().unwrap(),
                is_active: m.is_active,
                selected_tariff_id: m.selected_tariff_id,
                payment_id: m.payment_id,
            });
            Box::pin(async move { Ok(id) })
        });
        let listed = Arc::clone(&records);
        stores
            .messages
            .expect_list_active_for_subscription()
            .returning(move |subscription_id| {
                let active: Vec<_> = listed
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|m| m.subscription_id == subscription_id && m.is_active)
                    .cloned()
                    .collect();
                Box::pin(async move { Ok(active) })
            });
        let deactivated = Arc::clone(&records);
        stores.messages.expect_deactivate().returning(move |id| {
            for record in deactivated.lock().unwrap().iter_mut() {
                if record.id == id {
                    record.is_active = false;
                }
            }
            Box::pin(async { Ok(()) })
        });

        let next_message_id = Arc::new(AtomicI64::new(100));
        let mut chat = MockChatChannel::new();
        chat.expect_send().returning(move |_, _, _| {
            let id = next_message_id.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(id) })
        });
        chat.expect_edit()
            .withf(|_, _, text, keyboard| text.contains("outdated") && keyboard.is_none())
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let usecase = reminders(stores, chat);
        usecase.run_at(now()).await.unwrap();
        usecase.run_at(now() + Duration::hours(1)).await.unwrap();

        let records = records.lock().unwrap();
        let active: Vec<_> = records
            .iter()
            .filter(|m| m.subscription_id == stale_id && m.is_active)
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message_id, records[1].message_id);
    }

    #[tokio::test]
    async fn nothing_stale_sends_nothing() {
        let mut stores = MockStores::new();
        stores
            .subscriptions
            .expect_list_stale_expired_by_operator()
            .returning(|_| Box::pin(async { Ok(Vec::new()) }));

        let report = reminders(stores, MockChatChannel::new())
            .run_at(now())
            .await
            .unwrap();

        assert_eq!(report, ReminderReport::default());
    }

    #[tokio::test]
    async fn listing_failure_is_reported() {
        let mut stores = MockStores::new();
        stores
            .subscriptions
            .expect_list_stale_expired_by_operator()
            .returning(|_| Box::pin(async { Err(anyhow!("pool timed out")) }));

        let result = reminders(stores, MockChatChannel::new()).run_at(now()).await;

        assert!(result.is_err());
    }
}
