use thiserror::Error;
use tracing::info;
use uuid::Uuid;
use vpnbot::domain::entities::pending_orders::PendingOrderEntity;

use super::Stores;
use crate::services::in_flight::{InFlightKey, InFlightSet};

#[derive(Debug, Error)]
pub enum OrderActionError {
    #[error("pending order not found")]
    OrderNotFound,
    #[error("payment not found")]
    PaymentNotFound,
    #[error("pending order is being reconciled, retry shortly")]
    OrderBusy,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrderActionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            OrderActionError::OrderNotFound | OrderActionError::PaymentNotFound => {
                StatusCode::NOT_FOUND
            }
            OrderActionError::OrderBusy => StatusCode::CONFLICT,
            OrderActionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type OrderActionResult<T> = std::result::Result<T, OrderActionError>;

/// Chat-flow updates to a pending order before reconciliation consumes it. Each change
/// holds the order's in-flight marker so it never lands mid-reconciliation.
pub struct OrderActionsUseCase {
    stores: Stores,
    in_flight: InFlightSet,
}

impl OrderActionsUseCase {
    pub fn new(stores: Stores, in_flight: InFlightSet) -> Self {
        Self { stores, in_flight }
    }

    async fn existing_order(&self, order_id: Uuid) -> OrderActionResult<PendingOrderEntity> {
        self.stores
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderActionError::OrderNotFound)
    }

    /// Points the order at a fresh payment, e.g. after the first invoice lapsed.
    pub async fn relink_payment(&self, order_id: Uuid, payment_id: Uuid) -> OrderActionResult<()> {
        let _guard = self
            .in_flight
            .try_acquire(InFlightKey::Order(order_id))
            .ok_or(OrderActionError::OrderBusy)?;

        let order = self.existing_order(order_id).await?;
        self.stores
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or(OrderActionError::PaymentNotFound)?;

        self.stores.orders.update_payment(order.id, payment_id).await?;
        info!(
            %order_id,
            %payment_id,
            replaced = ?order.payment_id,
            "order_actions: payment relinked"
        );
        Ok(())
    }

    /// Records the chat message that reconciliation edits with the provisioning result.
    pub async fn attach_message(&self, order_id: Uuid, message_id: i64) -> OrderActionResult<()> {
        let _guard = self
            .in_flight
            .try_acquire(InFlightKey::Order(order_id))
            .ok_or(OrderActionError::OrderBusy)?;

        let order = self.existing_order(order_id).await?;
        self.stores.orders.update_message(order.id, message_id).await?;
        info!(%order_id, message_id, "order_actions: message attached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::MockStores;
    use mockall::predicate::eq;
    use vpnbot::domain::{
        entities::payments::PaymentEntity,
        value_objects::enums::payment_statuses::PaymentStatus,
    };

    fn order(id: Uuid) -> PendingOrderEntity {
        PendingOrderEntity {
            id,
            payment_id: Some(Uuid::new_v4()),
            admin_id: 1,
            assistant_id: 42,
            chat_id: 42,
            message_id: None,
            client_ref: "ann".to_string(),
            tariff_id: Uuid::new_v4(),
            server_id: None,
            amount_minor: 50_000,
            status: PaymentStatus::Pending,
        }
    }

    fn expect_order(stores: &mut MockStores, order_id: Uuid) {
        stores
            .orders
            .expect_find_by_id()
            .with(eq(order_id))
            .returning(|id| {
                let found = order(id);
                Box::pin(async move { Ok(Some(found)) })
            });
    }

    #[tokio::test]
    async fn relink_payment_updates_order() {
        let order_id = Uuid::new_v4();
        let payment_id = Uuid::new_v4();

        let mut stores = MockStores::new();
        expect_order(&mut stores, order_id);
        stores
            .payments
            .expect_find_by_id()
            .with(eq(payment_id))
            .returning(|id| {
                let payment = PaymentEntity {
                    id,
                    owner_id: 1,
                    amount_minor: 50_000,
                    status: PaymentStatus::Pending,
                    gateway_ref: "gw-2".to_string(),
                    processed_at: None,
                };
                Box::pin(async move { Ok(Some(payment)) })
            });
        stores
            .orders
            .expect_update_payment()
            .with(eq(order_id), eq(payment_id))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let in_flight = InFlightSet::new();
        let usecase = OrderActionsUseCase::new(stores.build(), in_flight.clone());

        usecase.relink_payment(order_id, payment_id).await.unwrap();
        assert!(in_flight.is_empty());
    }

    #[tokio::test]
    async fn unknown_payment_is_rejected() {
        let order_id = Uuid::new_v4();

        let mut stores = MockStores::new();
        expect_order(&mut stores, order_id);
        stores
            .payments
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        stores.orders.expect_update_payment().times(0);

        let usecase = OrderActionsUseCase::new(stores.build(), InFlightSet::new());
        let err = usecase
            .relink_payment(order_id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderActionError::PaymentNotFound));
    }

    #[tokio::test]
    async fn order_being_reconciled_is_not_touched() {
        let order_id = Uuid::new_v4();
        let in_flight = InFlightSet::new();
        let _reconciling = in_flight.try_acquire(InFlightKey::Order(order_id)).unwrap();

        let usecase = OrderActionsUseCase::new(MockStores::new().build(), in_flight);

        let err = usecase
            .relink_payment(order_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderActionError::OrderBusy));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        let err = usecase.attach_message(order_id, 77).await.unwrap_err();
        assert!(matches!(err, OrderActionError::OrderBusy));
    }

    #[tokio::test]
    async fn attach_message_records_chat_message() {
        let order_id = Uuid::new_v4();

        let mut stores = MockStores::new();
        expect_order(&mut stores, order_id);
        stores
            .orders
            .expect_update_message()
            .with(eq(order_id), eq(77))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let usecase = OrderActionsUseCase::new(stores.build(), InFlightSet::new());

        usecase.attach_message(order_id, 77).await.unwrap();
    }

    #[tokio::test]
    async fn consumed_order_is_not_found() {
        let mut stores = MockStores::new();
        stores
            .orders
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = OrderActionsUseCase::new(stores.build(), InFlightSet::new());
        let err = usecase
            .attach_message(Uuid::new_v4(), 77)
            .await
            .unwrap_err();

        assert!(matches!(err, OrderActionError::OrderNotFound));
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }
}
