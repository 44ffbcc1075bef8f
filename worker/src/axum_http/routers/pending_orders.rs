use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use super::auth::authorize_bearer;
use crate::usecases::order_actions::{OrderActionError, OrderActionsUseCase};

// Relink example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/pending-orders/$ID/payment" \
//     -H "Authorization: Bearer $INTERNAL_WORKER_TOKEN" \
//     -H "Content-Type: application/json" -d '{"payment_id":"..."}'

#[derive(Clone)]
pub struct OrderRouteState {
    token: Option<String>,
    usecase: Arc<OrderActionsUseCase>,
}

impl OrderRouteState {
    pub fn new(token: Option<String>, usecase: Arc<OrderActionsUseCase>) -> Self {
        Self { token, usecase }
    }
}

pub fn routes(state: OrderRouteState) -> Router {
    Router::new()
        .route("/:id/payment", post(relink_payment))
        .route("/:id/message", post(attach_message))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RelinkPaymentRequest {
    pub payment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AttachMessageRequest {
    pub message_id: i64,
}

fn error_response(action: &'static str, err: OrderActionError) -> Response {
    let status = err.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(action, error = ?err, "pending_orders router: action failed");
    }
    (status, err.to_string()).into_response()
}

pub async fn relink_payment(
    State(state): State<OrderRouteState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<RelinkPaymentRequest>,
) -> Response {
    if let Err(status) = authorize_bearer(&headers, state.token.as_deref()) {
        return (status, "unauthorized").into_response();
    }

    match state.usecase.relink_payment(id, payload.payment_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response("relink_payment", err),
    }
}

pub async fn attach_message(
    State(state): State<OrderRouteState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<AttachMessageRequest>,
) -> Response {
    if let Err(status) = authorize_bearer(&headers, state.token.as_deref()) {
        return (status, "unauthorized").into_response();
    }

    match state.usecase.attach_message(id, payload.message_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response("attach_message", err),
    }
}
