use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vpnbot::domain::{
    entities::{
        pending_orders::PendingOrderEntity, subscription_messages::SubscriptionMessageEntity,
        tariffs::TariffEntity,
    },
    repositories::{
        chat_channel::ChatChannel, payment_gateway::PaymentGateway,
        provisioning::ProvisioningService,
    },
    value_objects::{
        enums::{UnknownStatus, payment_statuses::PaymentStatus},
        provisioning::SubscriptionIntent,
    },
};

use super::{JobReport, Stores, message_activity::MessageActivity, notifications};
use crate::{
    scheduler::Job,
    services::in_flight::{InFlightKey, InFlightSet},
};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("payment {0} not found")]
    PaymentNotFound(Uuid),
    #[error("tariff {0} not found")]
    TariffNotFound(Uuid),
    #[error("subscription {0} not found")]
    SubscriptionNotFound(Uuid),
    #[error(transparent)]
    UnknownGatewayStatus(#[from] UnknownStatus),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Approved and applied; the item is gone.
    pub applied: usize,
    pub pending: usize,
    /// Rejected or cancelled; left untouched for the chat layer.
    pub declined: usize,
    /// Held by an overlapping tick, or consumed before this task got to it.
    pub skipped: usize,
    pub failed: usize,
}

impl ReconcileReport {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Applied => self.applied += 1,
            ItemOutcome::StillPending => self.pending += 1,
            ItemOutcome::Declined => self.declined += 1,
            ItemOutcome::InFlight | ItemOutcome::Consumed => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Applied,
    StillPending,
    Declined,
    InFlight,
    Consumed,
    Failed,
}

/// Polls the gateway for every pending order and every payment-linked subscription message
/// and applies approvals exactly once. Each item runs in its own task behind an
/// [`InFlightSet`] marker, so overlapping ticks never process the same item twice and one
/// bad item never holds up the rest.
#[derive(Clone)]
pub struct ReconcilePaymentsUseCase {
    stores: Stores,
    gateway: Arc<dyn PaymentGateway + Send + Sync>,
    provisioning: Arc<dyn ProvisioningService + Send + Sync>,
    chat: Arc<dyn ChatChannel + Send + Sync>,
    activity: MessageActivity,
    in_flight: InFlightSet,
    tz: Tz,
}

impl ReconcilePaymentsUseCase {
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway + Send + Sync>,
        provisioning: Arc<dyn ProvisioningService + Send + Sync>,
        chat: Arc<dyn ChatChannel + Send + Sync>,
        in_flight: InFlightSet,
        tz: Tz,
    ) -> Self {
        let activity = MessageActivity::new(Arc::clone(&stores.messages), Arc::clone(&chat));
        Self {
            stores,
            gateway,
            provisioning,
            chat,
            activity,
            in_flight,
            tz,
        }
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut tasks: JoinSet<ItemOutcome> = JoinSet::new();

        if !self.in_flight.is_empty() {
            debug!(in_flight = self.in_flight.len(), "reconcile: items still held from an earlier tick");
        }

        let (orders, messages) = tokio::join!(
            self.stores.orders.list_with_payment(),
            self.stores.messages.list_active_with_payment()
        );

        match orders {
            Ok(orders) => {
                for order in orders {
                    let this = self.clone();
                    tasks.spawn(async move { this.process_order(order.id, now).await });
                }
            }
            Err(err) => {
                report.failed += 1;
                error!(error = ?err, "reconcile: failed to list pending orders");
            }
        }

        match messages {
            Ok(messages) => {
                for message in messages {
                    let this = self.clone();
                    tasks.spawn(async move { this.process_message(message.id, now).await });
                }
            }
            Err(err) => {
                report.failed += 1;
                error!(error = ?err, "reconcile: failed to list payment-linked messages");
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    report.failed += 1;
                    error!(error = %err, "reconcile: item task aborted");
                }
            }
        }

        if report.applied > 0 || report.failed > 0 {
            info!(?report, "reconcile: tick finished");
        } else {
            debug!(?report, "reconcile: tick finished");
        }
        report
    }

    async fn process_order(&self, order_id: Uuid, now: DateTime<Utc>) -> ItemOutcome {
        let Some(_guard) = self.in_flight.try_acquire(InFlightKey::Order(order_id)) else {
            debug!(%order_id, "reconcile: order already in flight, skipping");
            return ItemOutcome::InFlight;
        };

        match self.reconcile_order(order_id, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%order_id, error = %err, "reconcile: order failed, will retry next tick");
                ItemOutcome::Failed
            }
        }
    }

    async fn process_message(&self, message_id: Uuid, now: DateTime<Utc>) -> ItemOutcome {
        let Some(_guard) = self.in_flight.try_acquire(InFlightKey::Message(message_id)) else {
            debug!(%message_id, "reconcile: renewal already in flight, skipping");
            return ItemOutcome::InFlight;
        };

        match self.reconcile_renewal(message_id, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%message_id, error = %err, "reconcile: renewal failed, will retry next tick");
                ItemOutcome::Failed
            }
        }
    }

    /// Re-reads the order under the marker: a previous holder may have consumed it after
    /// this tick listed it.
    async fn reconcile_order(
        &self,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome, ReconcileError> {
        let Some(order) = self.stores.orders.find_by_id(order_id).await? else {
            return Ok(ItemOutcome::Consumed);
        };
        let Some(payment_id) = order.payment_id else {
            return Ok(ItemOutcome::Consumed);
        };

        match self.payment_status(payment_id).await? {
            PaymentStatus::Pending => Ok(ItemOutcome::StillPending),
            status @ (PaymentStatus::Rejected | PaymentStatus::Cancelled) => {
                info!(%order_id, %payment_id, %status, "reconcile: order payment declined");
                Ok(ItemOutcome::Declined)
            }
            PaymentStatus::Approved => {
                self.apply_order(&order, payment_id, now).await?;
                Ok(ItemOutcome::Applied)
            }
        }
    }

    async fn reconcile_renewal(
        &self,
        message_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ItemOutcome, ReconcileError> {
        let Some(message) = self.stores.messages.find_by_id(message_id).await? else {
            return Ok(ItemOutcome::Consumed);
        };
        if !message.is_active {
            return Ok(ItemOutcome::Consumed);
        }
        let Some(payment_id) = message.payment_id else {
            return Ok(ItemOutcome::Consumed);
        };

        match self.payment_status(payment_id).await? {
            PaymentStatus::Pending => Ok(ItemOutcome::StillPending),
            status @ (PaymentStatus::Rejected | PaymentStatus::Cancelled) => {
                info!(%message_id, %payment_id, %status, "reconcile: renewal payment declined");
                Ok(ItemOutcome::Declined)
            }
            PaymentStatus::Approved => {
                self.apply_renewal(&message, payment_id, now).await?;
                Ok(ItemOutcome::Applied)
            }
        }
    }

    async fn payment_status(&self, payment_id: Uuid) -> Result<PaymentStatus, ReconcileError> {
        let payment = self
            .stores
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(ReconcileError::PaymentNotFound(payment_id))?;

        self.gateway
            .check_status(payment.gateway_ref)
            .await
            .map_err(|err| match err.downcast::<UnknownStatus>() {
                Ok(unknown) => ReconcileError::UnknownGatewayStatus(unknown),
                Err(other) => ReconcileError::Internal(other),
            })
    }

    async fn tariff(&self, tariff_id: Uuid) -> Result<TariffEntity, ReconcileError> {
        self.stores
            .tariffs
            .find_by_id(tariff_id)
            .await?
            .ok_or(ReconcileError::TariffNotFound(tariff_id))
    }

    /// Provision, then delete the order. Deleting is the commit point; the chat edit after
    /// it is a projection and its failure is only logged.
    async fn apply_order(
        &self,
        order: &PendingOrderEntity,
        payment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let tariff = self.tariff(order.tariff_id).await?;
        let intent = SubscriptionIntent {
            order_id: order.id,
            payment_id: Some(payment_id),
            admin_id: order.admin_id,
            assistant_id: order.assistant_id,
            client_ref: order.client_ref.clone(),
            tariff_id: tariff.id,
            duration_days: tariff.duration_days,
            server_id: order.server_id,
        };

        let credential = if order.is_migration() {
            self.provisioning.migrate_subscription(intent).await?
        } else {
            self.provisioning.create_subscription(intent).await?
        };
        info!(
            order_id = %order.id,
            %payment_id,
            migration = order.is_migration(),
            generated_user_id = %credential.generated_user_id,
            "reconcile: order provisioned"
        );

        self.mark_payment_processed(payment_id, now).await;

        if let Err(err) = self.stores.orders.delete(order.id).await {
            // Provisioned but still listed: the next tick would provision again.
            error!(
                order_id = %order.id,
                %payment_id,
                error = ?err,
                "reconcile: order provisioned but could not be deleted"
            );
            return Err(err.into());
        }

        let notice = notifications::order_completed(order, &tariff, &credential);
        let delivered = match order.message_id {
            Some(message_id) => {
                self.chat
                    .edit(order.chat_id, message_id, notice.text, notice.keyboard)
                    .await
            }
            None => self
                .chat
                .send(order.chat_id, notice.text, notice.keyboard)
                .await
                .map(|_| ()),
        };
        if let Err(err) = delivered {
            warn!(
                order_id = %order.id,
                chat_id = order.chat_id,
                error = ?err,
                "reconcile: order applied but chat update failed"
            );
        }

        Ok(())
    }

    /// Extend, then deactivate the message. Deactivation is the commit point.
    async fn apply_renewal(
        &self,
        message: &SubscriptionMessageEntity,
        payment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let subscription = self
            .stores
            .subscriptions
            .find_by_id(message.subscription_id)
            .await?
            .ok_or(ReconcileError::SubscriptionNotFound(message.subscription_id))?;

        let tariff_id = message
            .selected_tariff_id
            .unwrap_or(subscription.tariff_id);
        let tariff = self.tariff(tariff_id).await?;

        if tariff.id != subscription.tariff_id {
            self.stores
                .subscriptions
                .update_tariff(subscription.id, tariff.id)
                .await?;
            info!(
                subscription_id = %subscription.id,
                from = %subscription.tariff_id,
                to = %tariff.id,
                "reconcile: tariff changed before renewal"
            );
        }

        self.provisioning
            .extend_subscription(subscription.id, tariff.duration_days)
            .await?;

        let expires_at = subscription.expires_at + Duration::days(i64::from(tariff.duration_days));
        self.stores
            .subscriptions
            .renew(subscription.id, tariff.id, expires_at)
            .await?;
        info!(
            subscription_id = %subscription.id,
            %payment_id,
            previous_status = %subscription.status,
            expires_at = %expires_at,
            "reconcile: subscription renewed"
        );

        self.mark_payment_processed(payment_id, now).await;

        if let Err(err) = self.stores.messages.deactivate(message.id).await {
            error!(
                message_id = %message.id,
                subscription_id = %subscription.id,
                error = ?err,
                "reconcile: renewal applied but message could not be deactivated"
            );
            return Err(err.into());
        }

        let notice = notifications::renewal_completed(&subscription, &tariff, expires_at, self.tz);
        if let Err(err) = self
            .chat
            .edit(message.chat_id, message.message_id, notice.text, notice.keyboard)
            .await
        {
            warn!(
                message_id = %message.id,
                error = ?err,
                "reconcile: renewal applied but chat update failed"
            );
        }

        if let Err(err) = self
            .activity
            .outdate_siblings(subscription.id, Some(message.id))
            .await
        {
            warn!(
                subscription_id = %subscription.id,
                error = ?err,
                "reconcile: failed to outdate sibling messages"
            );
        }

        Ok(())
    }

    async fn mark_payment_processed(&self, payment_id: Uuid, now: DateTime<Utc>) {
        if let Err(err) = self
            .stores
            .payments
            .mark_processed(payment_id, PaymentStatus::Approved, now)
            .await
        {
            warn!(%payment_id, error = ?err, "reconcile: failed to mark payment processed");
        }
    }
}

#[async_trait]
impl Job for ReconcilePaymentsUseCase {
    fn name(&self) -> &'static str {
        "reconcile_payments"
    }

    async fn run(&self) -> Result<JobReport> {
        Ok(JobReport::Reconciliation(self.run_at(Utc::now()).await))
    }
}
