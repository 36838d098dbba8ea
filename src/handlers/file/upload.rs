use super::types::{CreateFolderRequest, CreateFolderResponse, UploadResponse, UploadedFile};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{allocate_dir, allocate_file};
use crate::utils::sanitize::sanitize_path;
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Query, State},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Join an optional target folder and a client filename, then sanitize the
/// result segment by segment.
fn upload_target(folder: Option<&str>, filename: &str) -> String {
    match folder.map(str::trim).filter(|f| !f.is_empty()) {
        Some(folder) => sanitize_path(&format!("{}/{}", folder, filename)),
        None => sanitize_path(filename),
    }
}

/// Write `stream` to a freshly allocated file at `relative`.
///
/// The upload goes through the handle returned by the allocator, so nothing
/// else can claim the name between allocation and the first write. Exceeding
/// the size limit removes the partial file.
async fn store_stream<S, E>(
    state: &AppState,
    relative: &str,
    original_name: String,
    mut stream: S,
) -> Result<UploadedFile, AppError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let desired = state.root.resolve(relative).await?;
    state.root.ensure_parent(&desired).await?;

    let (path, mut file) = allocate_file(&desired).await?;
    let mut size = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Upload interrupted");
                return Err(AppError::BadRequest(format!("Upload interrupted: {}", e)));
            }
        };

        size += chunk.len() as u64;
        if size > state.config.max_file_size {
            drop(file);
            fs::remove_file(&path).await.ok();
            return Err(AppError::BadRequest("File too large".to_string()));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    let stored = state.root.relative_path(&path);
    tracing::info!(original = %original_name, path = %stored, size, "Upload complete");

    Ok(UploadedFile {
        original_name,
        path: stored,
        size,
    })
}

/// Multipart upload. A `path` field, when present, names the target folder
/// for the file parts that follow it.
pub async fn upload_multipart(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    let mut folder: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "path" {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            folder = Some(value);
        } else if name == "file" || name == "files" {
            let original_name = field.file_name().unwrap_or("").to_string();
            let target = upload_target(folder.as_deref(), &original_name);
            files.push(store_stream(&state, &target, original_name, field).await?);
        }
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(
            "No file found in multipart form".to_string(),
        ));
    }

    Ok(Json(ApiResponse::success(UploadResponse { files })))
}

#[derive(Deserialize)]
pub struct UploadParams {
    path: String,
}

/// Raw body upload to `?path=`.
pub async fn upload_binary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Body,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    let original_name = params
        .path
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let target = upload_target(None, &params.path);

    let file = store_stream(&state, &target, original_name, body.into_data_stream()).await?;

    Ok(Json(ApiResponse::success(UploadResponse { files: vec![file] })))
}

/// Create a folder, suffixing the name when it is already taken.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Json<ApiResponse<CreateFolderResponse>>, AppError> {
    if req.path.trim().is_empty() {
        return Err(AppError::Validation("Folder path cannot be empty".to_string()));
    }

    let desired = state.root.resolve(&sanitize_path(&req.path)).await?;
    state.root.ensure_parent(&desired).await?;

    let created = allocate_dir(&desired).await?;
    let path = state.root.relative_path(&created);
    tracing::info!(path = %path, "Folder created");

    Ok(Json(ApiResponse::success(CreateFolderResponse { path })))
}
