use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vpnbot::domain::{
    repositories::chat_channel::ChatChannel,
    value_objects::{day_windows::DayWindow, enums::message_types::SubscriptionMessageType},
};

use super::{
    JobReport, Stores,
    message_activity::{MessageActivity, NotifyOutcome},
    notifications,
};
use crate::scheduler::Job;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpirationReport {
    pub expiring_notified: usize,
    pub overdue_notified: usize,
    pub notices_failed: usize,
    pub expired: usize,
    /// Listed as expirable but moved on before the conditional update.
    pub expire_skipped: usize,
    pub expire_failed: usize,
    /// Steps whose listing query failed.
    pub steps_failed: usize,
}

impl ExpirationReport {
    fn add_expiring(&mut self, outcome: NotifyOutcome) {
        self.expiring_notified += outcome.sent;
        self.notices_failed += outcome.failed;
    }

    fn add_overdue(&mut self, outcome: NotifyOutcome) {
        self.overdue_notified += outcome.sent;
        self.notices_failed += outcome.failed;
    }
}

/// Daily sweep: warn operators about subscriptions expiring on each configured horizon,
/// list active subscriptions already past expiry, then move every lapsed subscription to
/// `expired`. The three steps run in that order and fail independently.
pub struct ExpirationSweepUseCase {
    stores: Stores,
    activity: MessageActivity,
    notice_days: Vec<u32>,
    tz: Tz,
}

impl ExpirationSweepUseCase {
    pub fn new(
        stores: Stores,
        chat: Arc<dyn ChatChannel + Send + Sync>,
        notice_days: Vec<u32>,
        tz: Tz,
    ) -> Self {
        let activity = MessageActivity::new(Arc::clone(&stores.messages), chat);
        Self {
            stores,
            activity,
            notice_days,
            tz,
        }
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> ExpirationReport {
        let mut report = ExpirationReport::default();

        self.notify_expiring(now, &mut report).await;
        self.notify_overdue(now, &mut report).await;
        self.expire_lapsed(now, &mut report).await;

        info!(?report, "expiration: sweep finished");
        report
    }

    async fn notify_expiring(&self, now: DateTime<Utc>, report: &mut ExpirationReport) {
        for &day_offset in &self.notice_days {
            let window = DayWindow::for_offset(now, self.tz, day_offset);
            let groups = match self.stores.subscriptions.list_expiring_by_operator(window).await {
                Ok(groups) => groups,
                Err(err) => {
                    report.steps_failed += 1;
                    error!(day_offset, error = ?err, "expiration: failed to list expiring subscriptions");
                    continue;
                }
            };

            for group in groups {
                let summary =
                    notifications::expiring_summary(day_offset, &group.subscriptions, self.tz);
                let outcome = self
                    .activity
                    .notify_operator(&group, summary, SubscriptionMessageType::Expiring, |s| {
                        notifications::expiring_notice(s, day_offset, self.tz)
                    })
                    .await;
                debug!(operator_id = group.operator_id, day_offset, ?outcome, "expiration: operator notified");
                report.add_expiring(outcome);
            }
        }
    }

    async fn notify_overdue(&self, now: DateTime<Utc>, report: &mut ExpirationReport) {
        let groups = match self.stores.subscriptions.list_overdue_by_operator(now).await {
            Ok(groups) => groups,
            Err(err) => {
                report.steps_failed += 1;
                error!(error = ?err, "expiration: failed to list overdue subscriptions");
                return;
            }
        };

        for group in groups {
            let summary = notifications::overdue_summary(&group.subscriptions, self.tz);
            let outcome = self
                .activity
                .notify_operator(&group, summary, SubscriptionMessageType::Overdue, |s| {
                    notifications::overdue_notice(s, self.tz)
                })
                .await;
            report.add_overdue(outcome);
        }
    }

    async fn expire_lapsed(&self, now: DateTime<Utc>, report: &mut ExpirationReport) {
        let subscriptions = match self.stores.subscriptions.list_expirable(now).await {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                report.steps_failed += 1;
                error!(error = ?err, "expiration: failed to list expirable subscriptions");
                return;
            }
        };

        for subscription in subscriptions {
            if !subscription.should_expire(now) {
                report.expire_skipped += 1;
                warn!(
                    subscription_id = %subscription.id,
                    status = %subscription.status,
                    expires_at = %subscription.expires_at,
                    "expiration: listed subscription does not qualify, skipping"
                );
                continue;
            }

            match self.stores.subscriptions.mark_expired(subscription.id, now).await {
                Ok(true) => {
                    report.expired += 1;
                    info!(
                        subscription_id = %subscription.id,
                        assistant_id = subscription.assistant_id,
                        "expiration: subscription expired"
                    );
                }
                Ok(false) => {
                    report.expire_skipped += 1;
                    debug!(subscription_id = %subscription.id, "expiration: subscription moved on before update");
                }
                Err(err) => {
                    report.expire_failed += 1;
                    error!(subscription_id = %subscription.id, error = ?err, "expiration: failed to expire subscription");
                }
            }
        }
    }
}

#[async_trait]
impl Job for ExpirationSweepUseCase {
    fn name(&self) -> &'static str {
        "expiration_sweep"
    }

    async fn run(&self) -> Result<JobReport> {
        Ok(JobReport::Expiration(self.run_at(Utc::now()).await))
    }
}
