//! Local file inspection for finished downloads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::download::{TrackerError, TrackerResult};

/// Size and MIME type of a file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Size in bytes; 0 when the file does not exist.
    pub size: u64,
    /// MIME type guessed from the extension.
    pub mime_type: Option<String>,
}

/// Inspect a file given as a plain path or a `file://` URI.
///
/// A missing file is not an error: it reports size 0.
pub async fn file_info(path: &str) -> TrackerResult<FileInfo> {
    let path = resolve_path(path)?;

    let size = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => 0,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "File info: cannot stat file");
            0
        }
    };

    Ok(FileInfo {
        size,
        mime_type: mime_from_path(&path).map(str::to_string),
    })
}

/// Turn a caller-supplied path or `file://` URI into a filesystem path.
fn resolve_path(raw: &str) -> TrackerResult<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TrackerError::invalid_argument("missing path"));
    }

    if !raw.contains("://") {
        return Ok(PathBuf::from(raw));
    }

    let uri = url::Url::parse(raw)
        .map_err(|e| TrackerError::invalid_argument(format!("invalid uri '{raw}': {e}")))?;
    if uri.scheme() != "file" {
        return Err(TrackerError::invalid_argument(format!(
            "unsupported uri scheme '{}'",
            uri.scheme()
        )));
    }
    uri.to_file_path()
        .map_err(|()| TrackerError::invalid_argument(format!("uri has no local path: {raw}")))
}

/// Guess a MIME type from the file extension.
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "apk" => "application/vnd.android.package-archive",
        "epub" => "application/epub+zip",
        "js" => "text/javascript",
        "wasm" => "application/wasm",
        "bin" => "application/octet-stream",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => return None,
    };
    Some(mime)
}
