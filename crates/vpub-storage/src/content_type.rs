//! Content-type resolution for uploaded files.

use std::path::Path;

/// HLS master/media playlist.
pub const HLS_PLAYLIST: &str = "application/vnd.apple.mpegurl";
/// MPEG transport stream segment.
pub const MPEG_TS: &str = "video/MP2T";
/// Fallback when nothing else matches.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Resolve the content type of a file.
///
/// Order: the fixed HLS table, then a guess from the extension, then
/// `application/octet-stream`.
pub fn content_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("m3u8") => HLS_PLAYLIST.to_string(),
        Some("ts") => MPEG_TS.to_string(),
        _ => mime_guess::from_path(path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string()),
    }
}
