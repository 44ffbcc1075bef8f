use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::{
        day_windows::DayWindow, enums::subscription_statuses::SubscriptionStatus,
        operators::OperatorSubscriptions,
    },
};

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    async fn find_by_id(&self, subscription_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    /// Active subscriptions whose `expires_at` falls inside `window`.
    async fn list_expiring_by_operator(
        &self,
        window: DayWindow,
    ) -> Result<Vec<OperatorSubscriptions>>;

    /// Subscriptions still `active` although `expires_at < now`.
    async fn list_overdue_by_operator(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OperatorSubscriptions>>;

    /// `active` or `pending` subscriptions with `expires_at < now`.
    async fn list_expirable(&self, now: DateTime<Utc>) -> Result<Vec<SubscriptionEntity>>;

    /// `expired` subscriptions with `expires_at < cutoff`.
    async fn list_stale_expired_by_operator(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<OperatorSubscriptions>>;

    /// Conditional transition to `expired`; returns false when the row no longer qualifies
    /// (already moved on, renewed, or not yet past expiry at `now`).
    async fn mark_expired(&self, subscription_id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Paid renewal: sets tariff and expiry and forces status to `active`.
    async fn renew(
        &self,
        subscription_id: Uuid,
        tariff_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn update_tariff(&self, subscription_id: Uuid, tariff_id: Uuid) -> Result<()>;

    /// Conditional transition to `disabled`: applies only while the row still has the
    /// status and expiry the caller observed, so a renewal committed in between wins.
    async fn mark_disabled(
        &self,
        subscription_id: Uuid,
        seen_status: SubscriptionStatus,
        seen_expires_at: DateTime<Utc>,
    ) -> Result<bool>;
}
