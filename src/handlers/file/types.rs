use crate::storage::Entry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoResponse {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub formatted_size: String,
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    pub files: Vec<Entry>,
    pub total_files: usize,
    pub total_size: u64,
    pub total_size_formatted: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOperationResponse {
    pub success: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub new_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameResponse {
    pub old_name: String,
    pub new_name: String,
    pub new_path: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub original_name: String,
    pub path: String,
    pub size: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}

#[derive(Deserialize)]
pub struct CreateFolderRequest {
    pub path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderResponse {
    pub path: String,
}
