use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    health_status: String,
    uptime: String,
    version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessCheckResponse {
    readiness_status: String,
    upload_root: bool,
}

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<HealthCheckResponse>> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(ApiResponse::success(HealthCheckResponse {
        health_status: "ok".to_string(),
        uptime: format!("{}s", uptime),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ReadinessCheckResponse>> {
    let accessible = state.root.is_accessible();

    Json(ApiResponse::success(ReadinessCheckResponse {
        readiness_status: if accessible {
            "ready".to_string()
        } else {
            "not_ready".to_string()
        },
        upload_root: accessible,
    }))
}
