use super::types::{EntryKind, FileInfoResponse, FileOperationResponse, RenameRequest, RenameResponse};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{archive, list_tree, total_size};
use crate::utils::common::{content_disposition, format_size, mime_guess};
use crate::utils::sanitize::try_sanitize_filename;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio::fs;
use tokio_util::io::ReaderStream;

fn entry_name(path: &std::path::Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

pub async fn file_info(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<FileInfoResponse>>, AppError> {
    let target = state.root.resolve(&raw).await?;
    let metadata = fs::metadata(&target).await?;

    let (kind, size) = if metadata.is_dir() {
        (EntryKind::Directory, total_size(&list_tree(&target).await))
    } else {
        (EntryKind::File, metadata.len())
    };

    Ok(Json(ApiResponse::success(FileInfoResponse {
        name: entry_name(&target),
        path: state.root.relative_path(&target),
        size,
        formatted_size: format_size(size),
        modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        kind,
    })))
}

/// Stream a file, or a directory as `.tar.gz`.
///
/// Once headers are out a read error can no longer change the status; it is
/// logged and the body ends early.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Response, AppError> {
    let target = state.root.resolve(&raw).await?;
    let metadata = fs::metadata(&target).await?;
    let name = entry_name(&target);

    if metadata.is_dir() {
        let archive_name = format!("{}.tar.gz", name);
        let rx = archive::stream_tar_gz(target, name);
        let body = Body::from_stream(tokio_stream::wrappers::ReceiverStream::new(rx));

        let headers = [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&archive_name)),
        ];
        return Ok((headers, body).into_response());
    }

    let file = fs::File::open(&target).await?;
    let mime_type = mime_guess(&target).to_string();

    let logged_path = target.clone();
    let stream = ReaderStream::new(file).inspect_err(move |e| {
        tracing::error!(path = %logged_path.display(), error = %e, "Download interrupted");
    });
    let body = Body::from_stream(stream);

    tracing::info!(path = %state.root.relative_path(&target), size = metadata.len(), "Download started");

    let headers = [
        (header::CONTENT_TYPE, mime_type),
        (header::CONTENT_LENGTH, metadata.len().to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&name)),
    ];

    Ok((headers, body).into_response())
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<FileOperationResponse>>, AppError> {
    let target = state.root.resolve_entry(&raw).await?;
    if state.root.is_root(&target) {
        return Err(AppError::Forbidden("Cannot delete the upload root".to_string()));
    }

    let metadata = fs::symlink_metadata(&target).await?;
    let message = if metadata.is_dir() {
        fs::remove_dir_all(&target).await?;
        "Directory deleted successfully"
    } else {
        fs::remove_file(&target).await?;
        "File deleted successfully"
    };

    tracing::info!(path = %state.root.relative_path(&target), "{}", message);

    Ok(Json(ApiResponse::with_message(
        message,
        FileOperationResponse { success: true },
    )))
}

/// Rename a file or directory in place. Only the final name changes; the new
/// name is sanitized and may not replace an existing entry.
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<ApiResponse<RenameResponse>>, AppError> {
    let requested = req.new_name.trim();
    if requested.is_empty() {
        return Err(AppError::Validation("New name cannot be empty".to_string()));
    }
    let new_name = try_sanitize_filename(requested).ok_or_else(|| {
        AppError::Validation("New name contains no usable characters".to_string())
    })?;

    let source = state.root.resolve_entry(&raw).await?;
    if state.root.is_root(&source) {
        return Err(AppError::Forbidden("Cannot rename the upload root".to_string()));
    }
    let metadata = fs::symlink_metadata(&source).await?;

    let parent = source
        .parent()
        .map(|p| state.root.relative_path(p))
        .unwrap_or_default();
    let destination_raw = if parent.is_empty() {
        new_name.clone()
    } else {
        format!("{}/{}", parent, new_name)
    };
    let destination = state.root.resolve_entry(&destination_raw).await?;

    let old_name = entry_name(&source);
    if destination != source {
        rename::rename_no_replace(&source, &destination).await?;
    }

    let new_path = state.root.relative_path(&destination);
    tracing::info!(from = %state.root.relative_path(&source), to = %new_path, "Renamed");

    let message = if metadata.is_dir() {
        "Directory renamed successfully"
    } else {
        "File renamed successfully"
    };

    Ok(Json(ApiResponse::with_message(
        message,
        RenameResponse {
            old_name,
            new_name,
            new_path,
        },
    )))
}

mod rename {
    use crate::error::AppError;
    use std::io;
    use std::path::Path;

    fn conflict() -> AppError {
        AppError::Conflict("A file or folder with that name already exists".to_string())
    }

    pub async fn rename_no_replace(source: &Path, destination: &Path) -> Result<(), AppError> {
        let (source, destination) = (source.to_path_buf(), destination.to_path_buf());
        tokio::task::spawn_blocking(move || rename_exclusive(&source, &destination))
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
    }

    /// Rename without ever replacing the destination.
    ///
    /// On Linux the kernel enforces this atomically; elsewhere, or on
    /// filesystems without `RENAME_NOREPLACE`, it falls back to a check
    /// followed by a plain rename.
    fn rename_exclusive(source: &Path, destination: &Path) -> Result<(), AppError> {
        // Case-only change on a case-insensitive filesystem: both names are
        // the same entry, so there is nothing to conflict with.
        if is_case_only_change(source, destination) && same_entry(source, destination) {
            std::fs::rename(source, destination)?;
            return Ok(());
        }

        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        {
            use nix::errno::Errno;
            use nix::fcntl::{renameat2, RenameFlags};

            let (Some(src_dir), Some(src_name), Some(dst_dir), Some(dst_name)) = (
                source.parent(),
                source.file_name(),
                destination.parent(),
                destination.file_name(),
            ) else {
                return Err(AppError::BadRequest("Invalid rename target".to_string()));
            };
            let src_dir = std::fs::File::open(src_dir)?;
            let dst_dir = std::fs::File::open(dst_dir)?;

            match renameat2(
                &src_dir,
                src_name,
                &dst_dir,
                dst_name,
                RenameFlags::RENAME_NOREPLACE,
            ) {
                Ok(()) => return Ok(()),
                Err(Errno::EEXIST) => return Err(conflict()),
                Err(Errno::EINVAL) | Err(Errno::ENOSYS) => {}
                Err(errno) => return Err(io::Error::from(errno).into()),
            }
        }

        match std::fs::symlink_metadata(destination) {
            Ok(_) => return Err(conflict()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::rename(source, destination)?;
        Ok(())
    }

    fn is_case_only_change(source: &Path, destination: &Path) -> bool {
        match (source.file_name(), destination.file_name()) {
            (Some(a), Some(b)) => {
                let (a, b) = (a.to_string_lossy(), b.to_string_lossy());
                a != b
                    && a.to_lowercase() == b.to_lowercase()
                    && source.parent() == destination.parent()
            }
            _ => false,
        }
    }

    #[cfg(unix)]
    fn same_entry(a: &Path, b: &Path) -> bool {
        use std::os::unix::fs::MetadataExt;

        match (std::fs::symlink_metadata(a), std::fs::symlink_metadata(b)) {
            (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    fn same_entry(a: &Path, b: &Path) -> bool {
        match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

}
