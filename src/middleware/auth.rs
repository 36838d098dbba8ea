use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const PIN_HEADER: &str = "x-pin";

/// Require the configured PIN on every route except health checks.
/// Without a configured PIN all requests pass.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();
    if path == "/health" || path == "/health/ready" {
        return Ok(next.run(req).await);
    }

    let Some(expected) = state.config.pin.as_deref() else {
        return Ok(next.run(req).await);
    };

    let authorized = presented_pin(req.headers())
        .is_some_and(|pin| constant_time_eq(pin.as_bytes(), expected.as_bytes()));
    if !authorized {
        tracing::warn!(path = %path, "Rejected request with missing or invalid PIN");
        return Err(AppError::Unauthorized("Invalid PIN".to_string()));
    }

    Ok(next.run(req).await)
}

fn presented_pin(headers: &HeaderMap) -> Option<&str> {
    if let Some(pin) = headers.get(PIN_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(pin);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
