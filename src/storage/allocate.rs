use crate::utils::sanitize::split_extension;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Collision suffixes tried before giving up.
pub const MAX_ATTEMPTS: u32 = 10_000;

/// Create `desired`, or the first free `base (n).ext` next to it, and return
/// the final path together with the exclusively created handle.
///
/// The exclusive create is the only existence check, so concurrent callers
/// asking for the same name never end up sharing a path.
pub async fn allocate_file(desired: &Path) -> io::Result<(PathBuf, fs::File)> {
    for attempt in 0..=MAX_ATTEMPTS {
        let candidate = candidate_path(desired, attempt, true);
        let opened = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await;

        match opened {
            Ok(file) => {
                if attempt > 0 {
                    tracing::debug!(
                        desired = %desired.display(),
                        allocated = %candidate.display(),
                        "Name taken, allocated suffixed file"
                    );
                }
                return Ok((candidate, file));
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(exhausted(desired))
}

/// Create directory `desired`, or the first free `name (n)` next to it.
/// The parent directory must already exist.
pub async fn allocate_dir(desired: &Path) -> io::Result<PathBuf> {
    for attempt in 0..=MAX_ATTEMPTS {
        let candidate = candidate_path(desired, attempt, false);
        match fs::create_dir(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(exhausted(desired))
}

fn candidate_path(desired: &Path, attempt: u32, keep_extension: bool) -> PathBuf {
    if attempt == 0 {
        return desired.to_path_buf();
    }

    let name = desired
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let suffixed = if keep_extension {
        let (base, ext) = split_extension(&name);
        format!("{} ({}){}", base, attempt, ext)
    } else {
        format!("{} ({})", name, attempt)
    };

    desired.with_file_name(suffixed)
}

fn exhausted(desired: &Path) -> io::Error {
    tracing::error!(
        path = %desired.display(),
        attempts = MAX_ATTEMPTS,
        "Unique name allocation exhausted"
    );
    let name = desired
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    io::Error::new(
        io::ErrorKind::Other,
        format!("no free name for {} after {} attempts", name, MAX_ATTEMPTS),
    )
}
