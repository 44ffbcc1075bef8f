use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};

/// Internal routes are closed until `INTERNAL_WORKER_TOKEN` is configured.
pub fn authorize_bearer(headers: &HeaderMap, expected_token: Option<&str>) -> Result<(), StatusCode> {
    let expected_token = expected_token.ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if token == expected_token {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
