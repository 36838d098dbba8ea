use crate::utils::common::extension_of;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tokio::fs;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub extension: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub children: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    File(FileEntry),
    Directory(DirectoryEntry),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::File(f) => &f.name,
            Entry::Directory(d) => &d.name,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Entry::File(f) => f.size,
            Entry::Directory(d) => d.size,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }
}

/// List everything under `root`, directories first, names in collation order.
///
/// Dot-prefixed entries are skipped at every level. Entries that cannot be
/// stat'ed are logged and left out; an unreadable directory lists as empty.
pub async fn list_tree(root: &Path) -> Vec<Entry> {
    walk(root.to_path_buf(), String::new()).await
}

/// Number of files anywhere in the tree.
pub fn total_files(entries: &[Entry]) -> usize {
    entries
        .iter()
        .map(|entry| match entry {
            Entry::File(_) => 1,
            Entry::Directory(d) => total_files(&d.children),
        })
        .sum()
}

/// Sum of all file sizes in the tree.
pub fn total_size(entries: &[Entry]) -> u64 {
    entries.iter().map(Entry::size).sum()
}

fn walk(dir: PathBuf, rel: String) -> BoxFuture<'static, Vec<Entry>> {
    async move {
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) => {
                tracing::error!(path = %dir.display(), error = %e, "Failed to read directory");
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        loop {
            let dir_entry = match read_dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(path = %dir.display(), error = %e, "Failed to read directory entry");
                    break;
                }
            };

            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let entry_path = dir_entry.path();
            let metadata = match fs::symlink_metadata(&entry_path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(path = %entry_path.display(), error = %e, "Skipping entry that could not be stat'ed");
                    continue;
                }
            };

            let child_rel = if rel.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", rel, name)
            };
            let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);

            if metadata.is_dir() {
                let children = walk(entry_path, child_rel.clone()).await;
                entries.push(Entry::Directory(DirectoryEntry {
                    size: total_size(&children),
                    name,
                    path: child_rel,
                    modified_at,
                    children,
                }));
            } else if metadata.is_file() {
                entries.push(Entry::File(FileEntry {
                    extension: extension_of(&name),
                    name,
                    path: child_rel,
                    size: metadata.len(),
                    modified_at,
                }));
            }
        }

        entries.sort_by(compare_entries);
        entries
    }
    .boxed()
}

fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| collate(a.name(), b.name()))
}

/// Human-oriented name ordering.
///
/// Letters compare by base character first, ignoring accents and case, so
/// `apple`, `Éclair` and `zebra` sort the way a reader expects. Ties fall
/// back to accents, then case, then the raw string.
pub fn collate(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| secondary_key(a).cmp(&secondary_key(b)))
        .then_with(|| tertiary_key(a).cmp(&tertiary_key(b)))
        .then_with(|| a.cmp(b))
}

fn primary_key(s: &str) -> Vec<char> {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn secondary_key(s: &str) -> Vec<char> {
    s.nfd().flat_map(char::to_lowercase).collect()
}

/// Lowercase sorts before uppercase on ties.
fn tertiary_key(s: &str) -> Vec<bool> {
    s.nfd().map(char::is_uppercase).collect()
}
