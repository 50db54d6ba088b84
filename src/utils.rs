//! Utility functions for filename derivation and path manipulation

use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Sanitize a media title into a safe filename component
///
/// Path separators, control characters and characters that are invalid on
/// common file systems are replaced with underscores. Leading/trailing
/// whitespace and dots are trimmed. An empty result falls back to "video".
///
/// # Examples
///
/// ```
/// use tube_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Video: Part 1/2"), "My Video_ Part 1_2");
/// assert_eq!(sanitize_filename("  .hidden.  "), "hidden");
/// assert_eq!(sanitize_filename(""), "video");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_matches('.').trim();
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Map a container MIME type to a file extension
///
/// Unknown types fall back to "bin" rather than guessing.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    // Strip any parameters ("video/mp4; codecs=...")
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/3gpp" => "3gp",
        "video/x-matroska" => "mkv",
        "video/quicktime" => "mov",
        _ => "bin",
    }
}

/// Get a unique path for a file, handling collisions
///
/// With `overwrite` set, the original path is returned unchanged. Otherwise
/// a numbered suffix is appended until an unused name is found:
/// `movie.mp4` → `movie (1).mp4` → `movie (2).mp4` and so on.
pub fn unique_path(path: &Path, overwrite: bool) -> PathBuf {
    if overwrite || !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    for attempt in 1..=MAX_RENAME_ATTEMPTS {
        let candidate_name = match extension {
            Some(ext) => format!("{stem} ({attempt}).{ext}"),
            None => format!("{stem} ({attempt})"),
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return candidate;
        }
    }

    // Every numbered candidate exists; fall back to the original path
    path.to_path_buf()
}
