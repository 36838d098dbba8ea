use std::path::Path;

const SIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Format a byte count for display, using 1024-based units.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, SIZE_UNITS[unit])
}

/// Lowercase extension of a file name, leading dot included.
/// Empty when the name has none; a leading dot does not count.
pub fn extension_of(name: &str) -> String {
    let (_, ext) = crate::utils::sanitize::split_extension(name);
    ext.to_lowercase()
}

/// Guess MIME type from file path.
pub fn mime_guess(path: &Path) -> &str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => match ext.to_lowercase().as_str() {
            "html" | "htm" => "text/html",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" => "application/json",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "txt" | "log" | "md" => "text/plain",
            "csv" => "text/csv",
            "xml" => "text/xml",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "tar" => "application/x-tar",
            "gz" => "application/gzip",
            "mp3" => "audio/mpeg",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

/// Build a `Content-Disposition: attachment` value for a download.
///
/// Control characters (CR/LF included) are dropped and quotes and backslashes
/// replaced in the quoted `filename`. Names that are not plain ASCII also get
/// an RFC 5987 `filename*` parameter carrying the exact UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let needs_escaping = filename
        .chars()
        .any(|c| c.is_control() || c == '"' || c == '\\');

    if filename.is_ascii() && !needs_escaping {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let fallback: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
