use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum length of the base name, extension excluded.
const MAX_BASE_LEN: usize = 200;

/// Windows device names that cannot be used as a file base name.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize a single filename.
///
/// Never fails and never returns an empty string. The result only contains
/// characters from `[A-Za-z0-9._-]` and `sanitize_filename(sanitize_filename(x))`
/// equals `sanitize_filename(x)`.
pub fn sanitize_filename(raw: &str) -> String {
    let first = sanitize_once(raw);
    // A name whose extension was dropped may still end in a dotted segment;
    // running once more settles that segment as the extension.
    sanitize_once(&first)
}

/// Like [`sanitize_filename`], but returns `None` when nothing meaningful of
/// the input survives (for example a name made only of reserved characters).
pub fn try_sanitize_filename(raw: &str) -> Option<String> {
    let meaningful = strip_to_ascii(raw).chars().any(|c| c.is_ascii_alphanumeric());
    if !meaningful {
        return None;
    }
    Some(sanitize_filename(raw))
}

/// Sanitize a slash-separated relative path segment by segment.
///
/// Empty segments and the navigation segments `.` and `..` are dropped before
/// sanitizing, so the result can never climb out of the directory it is
/// joined onto.
pub fn sanitize_path(raw: &str) -> String {
    let segments: Vec<String> = raw
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(sanitize_filename)
        .collect();

    if segments.is_empty() {
        return sanitize_filename("");
    }
    segments.join("/")
}

/// Split a name at its last dot. A leading dot does not start an extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

fn sanitize_once(raw: &str) -> String {
    let (raw_base, raw_ext) = split_extension(raw);

    let meaningful_base = raw_base
        .chars()
        .any(|c| c != '.' && !c.is_whitespace());
    let raw_base = if meaningful_base {
        raw_base
    } else {
        "unnamed_file"
    };

    let mut base = collapse_separators(&strip_to_ascii(raw_base));
    base.retain(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let mut base = trim_base(&collapse_underscores(&base)).to_string();

    if base.is_empty() {
        base = "file".to_string();
    }

    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&base))
    {
        base.push_str("_file");
    }

    if base.len() > MAX_BASE_LEN {
        base.truncate(MAX_BASE_LEN);
        base = trim_base(&base).to_string();
    }

    let ext = sanitize_extension(raw_ext);
    let result = format!("{}{}", base, ext);

    if result.is_empty() || result == ext {
        let ext = if ext.is_empty() { ".txt" } else { ext.as_str() };
        return format!("file{}", ext);
    }
    result
}

/// Decompose, drop combining marks, then drop whatever is still non-ASCII.
fn strip_to_ascii(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii())
        .collect()
}

/// Replace every run of whitespace, `+` or `-` with one underscore.
fn collapse_separators(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c.is_whitespace() || c == '+' || c == '-' {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn collapse_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

fn trim_base(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, '.' | '_' | '-'))
}

fn sanitize_extension(raw_ext: &str) -> String {
    let body: String = raw_ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if body.is_empty() {
        String::new()
    } else {
        format!(".{}", body)
    }
}
