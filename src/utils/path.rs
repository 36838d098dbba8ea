use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut ret = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) => ret.push(component.as_os_str()),
            Component::RootDir => ret.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                ret.pop();
            }
            Component::Normal(c) => ret.push(c),
        }
    }
    ret
}

/// Canonicalize a path that may not exist yet.
///
/// The deepest existing ancestor is canonicalized (resolving symlinks) and the
/// missing tail is appended to it unchanged.
pub fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let mut existing = normalize_path(path);
    let mut tail = Vec::new();

    loop {
        match std::fs::canonicalize(&existing) {
            Ok(mut resolved) => {
                for name in tail.iter().rev() {
                    resolved.push(name);
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match (existing.file_name(), existing.parent()) {
                    (Some(name), Some(parent)) => {
                        tail.push(name.to_os_string());
                        existing = parent.to_path_buf();
                    }
                    _ => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Component-wise containment of two already canonical paths.
///
/// `Path::starts_with` compares whole components, so `/data/up` never
/// matches `/data/upload2`.
pub fn is_within(candidate: &Path, root: &Path) -> bool {
    candidate == root || candidate.starts_with(root)
}

/// Whether `candidate` lies inside `root` once both are canonicalized.
///
/// Paths that cannot be resolved are treated as outside.
pub fn is_contained(candidate: &Path, root: &Path) -> bool {
    match (canonicalize_lenient(candidate), canonicalize_lenient(root)) {
        (Ok(candidate), Ok(root)) => is_within(&candidate, &root),
        _ => false,
    }
}

/// Join canonical path components back into the slash-separated form used on
/// the wire.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
