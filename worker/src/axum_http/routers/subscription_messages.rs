use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use super::auth::authorize_bearer;
use crate::usecases::message_actions::{MessageActionError, MessageActionsUseCase};

// Called by the chat front end when an operator presses a notice button.
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/subscription-messages/$ID/disable" \
//     -H "Authorization: Bearer $INTERNAL_WORKER_TOKEN"

#[derive(Clone)]
pub struct MessageRouteState {
    token: Option<String>,
    usecase: Arc<MessageActionsUseCase>,
}

impl MessageRouteState {
    pub fn new(token: Option<String>, usecase: Arc<MessageActionsUseCase>) -> Self {
        Self { token, usecase }
    }
}

pub fn routes(state: MessageRouteState) -> Router {
    Router::new()
        .route("/:id/tariff", post(select_tariff))
        .route("/:id/payment", post(link_payment))
        .route("/:id/disable", post(disable_subscription))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SelectTariffRequest {
    pub tariff_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LinkPaymentRequest {
    pub payment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DisableResponse {
    pub subscription_id: Uuid,
    pub status: String,
}

fn error_response(action: &'static str, err: MessageActionError) -> Response {
    let status = err.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(action, error = ?err, "subscription_messages router: action failed");
    }
    (status, err.to_string()).into_response()
}

pub async fn select_tariff(
    State(state): State<MessageRouteState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<SelectTariffRequest>,
) -> Response {
    if let Err(status) = authorize_bearer(&headers, state.token.as_deref()) {
        return (status, "unauthorized").into_response();
    }

    match state.usecase.select_tariff(id, payload.tariff_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response("select_tariff", err),
    }
}

pub async fn link_payment(
    State(state): State<MessageRouteState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<LinkPaymentRequest>,
) -> Response {
    if let Err(status) = authorize_bearer(&headers, state.token.as_deref()) {
        return (status, "unauthorized").into_response();
    }

    match state.usecase.link_payment(id, payload.payment_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response("link_payment", err),
    }
}

pub async fn disable_subscription(
    State(state): State<MessageRouteState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Response {
    if let Err(status) = authorize_bearer(&headers, state.token.as_deref()) {
        return (status, "unauthorized").into_response();
    }

    match state.usecase.disable_subscription(id).await {
        Ok(subscription) => Json(DisableResponse {
            subscription_id: subscription.id,
            status: subscription.status.to_string(),
        })
        .into_response(),
        Err(err) => error_response("disable_subscription", err),
    }
}
