use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use vpnbot::domain::{
    entities::{
        subscription_messages::SubscriptionMessageEntity, subscriptions::SubscriptionEntity,
    },
    repositories::chat_channel::ChatChannel,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

use super::{Stores, message_activity::MessageActivity, notifications};

#[derive(Debug, Error)]
pub enum MessageActionError {
    #[error("subscription message not found")]
    MessageNotFound,
    #[error("subscription message is no longer active")]
    MessageInactive,
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("tariff not found or inactive")]
    TariffNotFound,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("subscription cannot be disabled from status {0}")]
    InvalidTransition(SubscriptionStatus),
    #[error("subscription changed while it was being disabled")]
    SubscriptionChanged,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl MessageActionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            MessageActionError::MessageNotFound
            | MessageActionError::SubscriptionNotFound
            | MessageActionError::TariffNotFound
            | MessageActionError::PaymentNotFound => StatusCode::NOT_FOUND,
            MessageActionError::MessageInactive
            | MessageActionError::InvalidTransition(_)
            | MessageActionError::SubscriptionChanged => StatusCode::CONFLICT,
            MessageActionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ActionResult<T> = std::result::Result<T, MessageActionError>;

/// Operator-initiated changes to a live subscription message, forwarded by the chat layer.
pub struct MessageActionsUseCase {
    stores: Stores,
    chat: Arc<dyn ChatChannel + Send + Sync>,
    activity: MessageActivity,
}

impl MessageActionsUseCase {
    pub fn new(stores: Stores, chat: Arc<dyn ChatChannel + Send + Sync>) -> Self {
        let activity = MessageActivity::new(Arc::clone(&stores.messages), Arc::clone(&chat));
        Self {
            stores,
            chat,
            activity,
        }
    }

    async fn active_message(&self, message_id: Uuid) -> ActionResult<SubscriptionMessageEntity> {
        let message = self
            .stores
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or(MessageActionError::MessageNotFound)?;
        if !message.is_active {
            return Err(MessageActionError::MessageInactive);
        }
        Ok(message)
    }

    /// Records a tariff choice for the next paid renewal through this message. A tariff
    /// change resolves the subscription's other live messages.
    pub async fn select_tariff(&self, message_id: Uuid, tariff_id: Uuid) -> ActionResult<()> {
        let message = self.active_message(message_id).await?;
        let tariff = self
            .stores
            .tariffs
            .find_by_id(tariff_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or(MessageActionError::TariffNotFound)?;

        self.stores
            .messages
            .set_selected_tariff(message.id, tariff.id)
            .await?;
        info!(
            message_id = %message.id,
            subscription_id = %message.subscription_id,
            tariff_id = %tariff.id,
            "message_actions: tariff selected"
        );

        if let Err(err) = self
            .activity
            .outdate_siblings(message.subscription_id, Some(message.id))
            .await
        {
            warn!(subscription_id = %message.subscription_id, error = ?err, "message_actions: failed to outdate siblings");
        }
        Ok(())
    }

    /// Links a fresh payment; the reconciliation worker picks the message up from here.
    pub async fn link_payment(&self, message_id: Uuid, payment_id: Uuid) -> ActionResult<()> {
        let message = self.active_message(message_id).await?;
        self.stores
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(MessageActionError::PaymentNotFound)?;

        self.stores.messages.set_payment(message.id, payment_id).await?;
        info!(
            message_id = %message.id,
            subscription_id = %message.subscription_id,
            %payment_id,
            replaced = ?message.payment_id,
            "message_actions: payment linked"
        );
        Ok(())
    }

    /// The only way into `disabled`. Resolves the message and outdates its siblings.
    pub async fn disable_subscription(&self, message_id: Uuid) -> ActionResult<SubscriptionEntity> {
        let message = self.active_message(message_id).await?;
        let mut subscription = self
            .stores
            .subscriptions
            .find_by_id(message.subscription_id)
            .await?
            .ok_or(MessageActionError::SubscriptionNotFound)?;

        if !subscription.status.can_disable() {
            return Err(MessageActionError::InvalidTransition(subscription.status));
        }

        let disabled = self
            .stores
            .subscriptions
            .mark_disabled(subscription.id, subscription.status, subscription.expires_at)
            .await?;
        if !disabled {
            warn!(
                subscription_id = %subscription.id,
                message_id = %message.id,
                "message_actions: subscription changed before disable applied"
            );
            return Err(MessageActionError::SubscriptionChanged);
        }
        subscription.status = SubscriptionStatus::Disabled;
        info!(
            subscription_id = %subscription.id,
            message_id = %message.id,
            "message_actions: subscription disabled"
        );

        self.stores.messages.deactivate(message.id).await?;

        let notice = notifications::disabled_confirmation(&subscription);
        if let Err(err) = self
            .chat
            .edit(message.chat_id, message.message_id, notice.text, notice.keyboard)
            .await
        {
            warn!(message_id = %message.id, error = ?err, "message_actions: confirmation edit failed");
        }

        if let Err(err) = self
            .activity
            .outdate_siblings(subscription.id, Some(message.id))
            .await
        {
            warn!(subscription_id = %subscription.id, error = ?err, "message_actions: failed to outdate siblings");
        }

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{self, MockStores};
    use chrono::Utc;
    use mockall::predicate::eq;
    use vpnbot::domain::{
        entities::{payments::PaymentEntity, tariffs::TariffEntity},
        repositories::chat_channel::MockChatChannel,
        value_objects::enums::{
            message_types::SubscriptionMessageType, payment_statuses::PaymentStatus,
        },
    };

    fn message(subscription_id: Uuid, is_active: bool) -> SubscriptionMessageEntity {
        SubscriptionMessageEntity {
            id: Uuid::new_v4(),
            subscription_id,
            chat_id: 42,
            message_id: 11,
            type_: SubscriptionMessageType::Overdue,
            is_active,
            selected_tariff_id: None,
            payment_id: None,
        }
    }

    fn expect_message(stores: &mut MockStores, message: &SubscriptionMessageEntity) {
        let found = message.clone();
        stores
            .messages
            .expect_find_by_id()
            .with(eq(message.id))
            .returning(move |_| {
                let found = found.clone();
                Box::pin(async move { Ok(Some(found)) })
            });
    }

    #[tokio::test]
    async fn select_tariff_records_choice_and_outdates_siblings() {
        let subscription_id = Uuid::new_v4();
        let message = message(subscription_id, true);
        let message_id = message.id;
        let sibling = SubscriptionMessageEntity {
            id: Uuid::new_v4(),
            message_id: 12,
            type_: SubscriptionMessageType::Expiring,
            ..message.clone()
        };
        let sibling_id = sibling.id;
        let active = vec![message.clone(), sibling];
        let tariff_id = Uuid::new_v4();

        let mut stores = MockStores::new();
        expect_message(&mut stores, &message);
        stores
            .tariffs
            .expect_find_by_id()
            .with(eq(tariff_id))
            .returning(move |id| {
                let tariff = test_support::tariff(id, 90);
                Box::pin(async move { Ok(Some(tariff)) })
            });
        stores
            .messages
            .expect_set_selected_tariff()
            .with(eq(message_id), eq(tariff_id))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        stores
            .messages
            .expect_list_active_for_subscription()
            .with(eq(subscription_id))
            .returning(move |_| {
                let active = active.clone();
                Box::pin(async move { Ok(active) })
            });
        stores
            .messages
            .expect_deactivate()
            .with(eq(sibling_id))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));
        stores
            .messages
            .expect_deactivate()
            .with(eq(message_id))
            .times(0);

        let mut chat = MockChatChannel::new();
        chat.expect_edit()
            .withf(|_, message_id, text, _| *message_id == 12 && text.contains("outdated"))
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let usecase = MessageActionsUseCase::new(stores.build(), Arc::new(chat));

        usecase.select_tariff(message_id, tariff_id).await.unwrap();
    }

    #[tokio::test]
    async fn inactive_tariff_is_not_selectable() {
        let message = message(Uuid::new_v4(), true);
        let message_id = message.id;

        let mut stores = MockStores::new();
        expect_message(&mut stores, &message);
        stores.tariffs.expect_find_by_id().returning(|id| {
            let tariff = TariffEntity {
                is_active: false,
                ..test_support::tariff(id, 30)
            };
            Box::pin(async move { Ok(Some(tariff)) })
        });
        stores.messages.expect_set_selected_tariff().times(0);

        let usecase = MessageActionsUseCase::new(stores.build(), Arc::new(MockChatChannel::new()));
        let err = usecase
            .select_tariff(message_id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, MessageActionError::TariffNotFound));
    }

    #[tokio::test]
    async fn actions_on_inactive_message_are_rejected() {
        let message = message(Uuid::new_v4(), false);
        let message_id = message.id;

        let mut stores = MockStores::new();
        expect_message(&mut stores, &message);

        let usecase = MessageActionsUseCase::new(stores.build(), Arc::new(MockChatChannel::new()));

        let err = usecase
            .link_payment(message_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, MessageActionError::MessageInactive));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        let err = usecase.disable_subscription(message_id).await.unwrap_err();
        assert!(matches!(err, MessageActionError::MessageInactive));
    }

    #[tokio::test]
    async fn link_payment_hands_message_to_reconciliation() {
        let message = message(Uuid::new_v4(), true);
        let message_id = message.id;
        let payment_id = Uuid::new_v4();

        let mut stores = MockStores::new();
        expect_message(&mut stores, &message);
        stores
            .payments
            .expect_find_by_id()
            .with(eq(payment_id))
            .returning(|id| {
                let payment = PaymentEntity {
                    id,
                    owner_id: 42,
                    amount_minor: 50_000,
                    status: PaymentStatus::Pending,
                    gateway_ref: "gw-1".to_string(),
                    processed_at: None,
                };
                Box::pin(async move { Ok(Some(payment)) })
            });
        stores
            .messages
            .expect_set_payment()
            .with(eq(message_id), eq(payment_id))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = MessageActionsUseCase::new(stores.build(), Arc::new(MockChatChannel::new()));

        usecase.link_payment(message_id, payment_id).await.unwrap();
    }

    #[tokio::test]
    async fn disable_resolves_message_and_outdates_siblings() {
        let subscription = test_support::subscription(
            42,
            "ann",
            SubscriptionStatus::Expired,
            Utc::now() - chrono::Duration::days(2),
        );
        let subscription_id = subscription.id;
        let seen_expires_at = subscription.expires_at;
        let resolving = message(subscription_id, true);
        let resolving_id = resolving.id;
        let sibling = SubscriptionMessageEntity {
            id: Uuid::new_v4(),
            message_id: 12,
            ..resolving.clone()
        };
        let sibling_id = sibling.id;
        let active = vec![resolving.clone(), sibling];

        let mut stores = MockStores::new();
        expect_message(&mut stores, &resolving);
        stores
            .subscriptions
            .expect_find_by_id()
            .with(eq(subscription_id))
            .returning(move |_| {
                let subscription = subscription.clone();
                Box::pin(async move { Ok(Some(subscription)) })
            });
        stores
            .subscriptions
            .expect_mark_disabled()
            .with(
                eq(subscription_id),
                eq(SubscriptionStatus::Expired),
                eq(seen_expires_at),
            )
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(true) }));
        stores
            .messages
            .expect_deactivate()
            .with(eq(resolving_id))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));
        stores
            .messages
            .expect_list_active_for_subscription()
            .returning(move |_| {
                let active = active.clone();
                Box::pin(async move { Ok(active) })
            });
        stores
            .messages
            .expect_deactivate()
            .with(eq(sibling_id))
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut chat = MockChatChannel::new();
        chat.expect_edit()
            .withf(|_, message_id, text, _| *message_id == 11 && text.contains("disabled"))
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));
        chat.expect_edit()
            .withf(|_, message_id, text, _| *message_id == 12 && text.contains("outdated"))
            .times(1)
            .returning(|_, _, _, _| Box::pin(async { Ok(()) }));

        let usecase = MessageActionsUseCase::new(stores.build(), Arc::new(chat));
        let disabled = usecase.disable_subscription(resolving_id).await.unwrap();

        assert_eq!(disabled.status, SubscriptionStatus::Disabled);
    }

    #[tokio::test]
    async fn already_disabled_subscription_is_a_conflict() {
        let subscription = test_support::subscription(
            42,
            "ann",
            SubscriptionStatus::Disabled,
            Utc::now(),
        );
        let message = message(subscription.id, true);
        let message_id = message.id;

        let mut stores = MockStores::new();
        expect_message(&mut stores, &message);
        stores.subscriptions.expect_find_by_id().returning(move |_| {
            let subscription = subscription.clone();
            Box::pin(async move { Ok(Some(subscription)) })
        });
        stores.subscriptions.expect_mark_disabled().times(0);

        let usecase = MessageActionsUseCase::new(stores.build(), Arc::new(MockChatChannel::new()));
        let err = usecase.disable_subscription(message_id).await.unwrap_err();

        assert!(matches!(
            err,
            MessageActionError::InvalidTransition(SubscriptionStatus::Disabled)
        ));
    }

    #[tokio::test]
    async fn renewal_committed_before_disable_wins() {
        let subscription = test_support::subscription(
            42,
            "ann",
            SubscriptionStatus::Expired,
            Utc::now() - chrono::Duration::days(2),
        );
        let message = message(subscription.id, true);
        let message_id = message.id;

        let mut stores = MockStores::new();
        expect_message(&mut stores, &message);
        stores.subscriptions.expect_find_by_id().returning(move |_| {
            let subscription = subscription.clone();
            Box::pin(async move { Ok(Some(subscription)) })
        });
        stores
            .subscriptions
            .expect_mark_disabled()
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(false) }));
        stores.messages.expect_deactivate().times(0);

        let usecase = MessageActionsUseCase::new(stores.build(), Arc::new(MockChatChannel::new()));
        let err = usecase.disable_subscription(message_id).await.unwrap_err();

        assert!(matches!(err, MessageActionError::SubscriptionChanged));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }
}
