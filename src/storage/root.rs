use crate::error::AppError;
use crate::utils::path::{
    canonicalize_lenient, is_contained, is_within, normalize_path, to_slash_path,
};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Reserved child of the upload root holding internal metadata.
pub const METADATA_DIR: &str = ".metadata";

/// The directory every managed file lives under.
///
/// Always canonical, so containment checks compare like with like.
#[derive(Debug, Clone)]
pub struct UploadRoot {
    path: PathBuf,
}

impl UploadRoot {
    /// Create the directory if needed, canonicalize it and make sure it is
    /// writable. Called once at startup.
    pub fn init(path: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(path)?;
        let path = std::fs::canonicalize(path)?;

        let metadata_dir = path.join(METADATA_DIR);
        std::fs::create_dir_all(&metadata_dir)?;

        let probe = metadata_dir.join(".write-test");
        std::fs::write(&probe, b"ok")?;
        std::fs::remove_file(&probe)?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.path.join(METADATA_DIR)
    }

    pub fn is_accessible(&self) -> bool {
        self.path.is_dir()
    }

    /// Map a caller-supplied relative path to a canonical path inside the root.
    ///
    /// The lexical check runs before any syscall, so a traversal attempt is
    /// refused without probing the target. Symlinks are then resolved and the
    /// check repeated on the real location.
    pub async fn resolve(&self, raw: &str) -> Result<PathBuf, AppError> {
        let lexical = self.lexical(raw)?;
        self.canonical(raw, lexical).await
    }

    /// Like [`resolve`](Self::resolve), but the last component is kept as
    /// named, so a symlink there is the entry itself rather than its target.
    /// Delete and rename act on entries, not on what they point at.
    pub async fn resolve_entry(&self, raw: &str) -> Result<PathBuf, AppError> {
        let lexical = self.lexical(raw)?;
        if lexical == self.path {
            return Ok(lexical);
        }
        let (Some(parent), Some(name)) = (lexical.parent(), lexical.file_name()) else {
            return Err(self.reject(raw));
        };

        let entry = self.canonical(raw, parent.to_path_buf()).await?.join(name);
        if self.is_reserved(&entry) {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(entry)
    }

    fn lexical(&self, raw: &str) -> Result<PathBuf, AppError> {
        if raw.contains('\0') {
            return Err(self.reject(raw));
        }

        let lexical = normalize_path(&self.path.join(raw));
        if !is_within(&lexical, &self.path) {
            return Err(self.reject(raw));
        }
        if self.is_reserved(&lexical) {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Ok(lexical)
    }

    async fn canonical(&self, raw: &str, lexical: PathBuf) -> Result<PathBuf, AppError> {
        let canonical = tokio::task::spawn_blocking(move || canonicalize_lenient(&lexical))
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))??;

        if !is_within(&canonical, &self.path) {
            return Err(self.reject(raw));
        }
        if self.is_reserved(&canonical) {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        Ok(canonical)
    }

    /// Create the missing parent directories of a resolved path, then confirm
    /// the parent still lies inside the root once they exist.
    pub async fn ensure_parent(&self, path: &Path) -> Result<(), AppError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };

        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::InternalServerError(format!("Failed to create directory: {}", e))
        })?;

        let (parent, root) = (parent.to_path_buf(), self.path.clone());
        let contained = tokio::task::spawn_blocking(move || is_contained(&parent, &root))
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        if !contained {
            return Err(self.reject(&path.to_string_lossy()));
        }
        Ok(())
    }

    /// Slash-separated path of `path` relative to the root.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.path)
            .map(to_slash_path)
            .unwrap_or_default()
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.path
    }

    fn is_reserved(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.path) {
            Ok(rel) => matches!(
                rel.components().next(),
                Some(Component::Normal(name)) if name == METADATA_DIR
            ),
            Err(_) => false,
        }
    }

    fn reject(&self, raw: &str) -> AppError {
        tracing::warn!(path = ?raw, "Rejected path outside upload root");
        AppError::Forbidden("Access denied".to_string())
    }
}
