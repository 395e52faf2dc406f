//! HTTP cache validators
//!
//! `ETag` and `Last-Modified` are derived from file metadata so that a
//! conditional request never needs the file content.

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// IMF-fixdate layout used by `Last-Modified` / `If-Modified-Since`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Generate a quoted `ETag` from file size and modification time
///
/// # Examples
/// ```
/// use file_bridge::http::cache::metadata_etag;
/// assert_eq!(metadata_etag(255, None), "\"ff-0\"");
/// ```
pub fn metadata_etag(len: u64, modified: Option<SystemTime>) -> String {
    let stamp = modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());
    format!("\"{len:x}-{stamp:x}\"")
}

/// Format a timestamp as an HTTP date
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports a single tag, a comma-separated list, weak tags and `*`.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').map(str::trim).any(|e| {
            e == "*" || e == etag || e.strip_prefix("W/").is_some_and(|weak| weak == etag)
        })
    })
}

/// Check `If-Modified-Since` against the file's modification time
///
/// Unparseable dates and unknown modification times never match.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: Option<SystemTime>) -> bool {
    let (Some(header), Some(modified)) = (if_modified_since, modified) else {
        return false;
    };
    let Ok(since) = DateTime::parse_from_rfc2822(header.trim()) else {
        return false;
    };

    // HTTP dates have second resolution
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}
