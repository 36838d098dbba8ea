use super::types::ListFilesResponse;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{list_tree, total_files, total_size};
use crate::utils::common::format_size;
use axum::{extract::State, Json};
use std::sync::Arc;

/// The full tree under the upload root. Read failures degrade to an empty or
/// partial listing instead of an error.
pub async fn list_files(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ListFilesResponse>> {
    let files = list_tree(state.root.path()).await;
    let total_files = total_files(&files);
    let total_size = total_size(&files);

    tracing::debug!(total_files, total_size, "Listed upload root");

    Json(ApiResponse::success(ListFilesResponse {
        files,
        total_files,
        total_size,
        total_size_formatted: format_size(total_size),
    }))
}
