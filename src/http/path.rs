//! URL path helpers
//!
//! Route parameters arrive percent-encoded; file names in the wild are often
//! not ASCII, so decoding happens before any filesystem access.

use percent_encoding::percent_decode_str;

/// Decode `%XX` escapes. Malformed escapes are kept literally and invalid
/// UTF-8 is replaced with U+FFFD.
///
/// # Examples
/// ```
/// use file_bridge::http::path::percent_decode;
/// assert_eq!(percent_decode("8%E6%9C%88.mp4"), "8月.mp4");
/// assert_eq!(percent_decode("a%20b%zz"), "a b%zz");
/// ```
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Split a path into its directory part and final file name, on the last `/`.
/// Without a separator the directory part is empty.
///
/// # Examples
/// ```
/// use file_bridge::http::path::split_file_path;
/// assert_eq!(split_file_path("E:/Downloads/clip.mp4"), ("E:/Downloads", "clip.mp4"));
/// assert_eq!(split_file_path("notes.txt"), ("", "notes.txt"));
/// ```
pub fn split_file_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        // keep the root itself when the file sits directly under "/"
        Some(("", name)) if path.starts_with('/') => ("/", name),
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}
