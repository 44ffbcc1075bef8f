use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{error, info};

use super::auth::authorize_bearer;
use crate::scheduler::Job;

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/workers/expiration_sweep/run" \
//     -H "Authorization: Bearer $INTERNAL_WORKER_TOKEN"

#[derive(Clone)]
pub struct WorkerRouteState {
    token: Option<String>,
    jobs: Arc<HashMap<&'static str, Arc<dyn Job>>>,
}

impl WorkerRouteState {
    pub fn new(token: Option<String>, jobs: Vec<Arc<dyn Job>>) -> Self {
        let jobs = jobs.into_iter().map(|job| (job.name(), job)).collect();
        Self {
            token,
            jobs: Arc::new(jobs),
        }
    }
}

pub fn routes(state: WorkerRouteState) -> Router {
    Router::new()
        .route("/:name/run", post(run_worker))
        .with_state(state)
}

pub async fn run_worker(
    State(state): State<WorkerRouteState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(status) = authorize_bearer(&headers, state.token.as_deref()) {
        return (status, "unauthorized").into_response();
    }

    let Some(job) = state.jobs.get(name.as_str()).cloned() else {
        return (StatusCode::NOT_FOUND, "unknown worker").into_response();
    };

    info!(worker = job.name(), "workers router: manual run requested");
    match job.run().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            error!(worker = job.name(), error = ?err, "workers router: manual run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "worker run failed").into_response()
        }
    }
}
