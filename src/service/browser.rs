//! File-browser service
//!
//! `GET /list/<path>` returns the entry names of a directory as a JSON array.
//! `GET /file/<path>` returns the raw bytes of a file, with conditional and
//! single-range request support. The path is everything after the prefix,
//! percent-decoded; absolute paths are used as-is (`/list//srv`).
//! Errors are `{"message": "..."}` with 404 for the not-found family.

use hyper::{Method, Request, Response, StatusCode};
use std::ffi::OsStr;
use std::path::Path;

use crate::config::AppState;
use crate::files::{ops, FsError};
use crate::http::path::{percent_decode, split_file_path};
use crate::http::{self, body, cache, mime, RangeParseResult, ResponseBody, Validators};
use crate::logger;

pub const LIST_PREFIX: &str = "/list/";
pub const FILE_PREFIX: &str = "/file/";
const ALLOW: &str = "GET, HEAD, OPTIONS";

/// Matched route with its raw (still encoded) path parameter
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    List(&'a str),
    File(&'a str),
}

fn match_route(path: &str) -> Option<Route<'_>> {
    if let Some(rest) = path.strip_prefix(LIST_PREFIX) {
        return (!rest.is_empty()).then_some(Route::List(rest));
    }
    if let Some(rest) = path.strip_prefix(FILE_PREFIX) {
        return (!rest.is_empty()).then_some(Route::File(rest));
    }
    None
}

/// Request headers that shape a file response
#[derive(Debug, Default)]
pub struct FileRequest<'a> {
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub range: Option<&'a str>,
}

impl<'a> FileRequest<'a> {
    fn from_request<B>(req: &'a Request<B>) -> Self {
        Self {
            is_head: req.method() == Method::HEAD,
            if_none_match: header_str(req, "if-none-match"),
            if_modified_since: header_str(req, "if-modified-since"),
            range: header_str(req, "range"),
        }
    }
}

fn header_str<'a, B>(req: &'a Request<B>, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

pub async fn handle_request<B>(req: &Request<B>, state: &AppState) -> Response<ResponseBody> {
    let Some(route) = match_route(req.uri().path()) else {
        return http::json_message(StatusCode::NOT_FOUND, "Not Found");
    };

    match *req.method() {
        Method::GET | Method::HEAD => {}
        Method::OPTIONS => {
            return http::build_options_response(ALLOW, state.config.http.enable_cors);
        }
        ref other => {
            logger::log_warning(&format!("Method not allowed: {other} {}", req.uri().path()));
            return http::build_405_response(ALLOW);
        }
    }

    match route {
        Route::List(raw) => list_directory(&percent_decode(raw), state).await,
        Route::File(raw) => {
            serve_file(&FileRequest::from_request(req), &percent_decode(raw), state).await
        }
    }
}

/// List a directory given its decoded path
pub async fn list_directory(raw_path: &str, state: &AppState) -> Response<ResponseBody> {
    let listing = match state.guard.resolve(raw_path) {
        Ok(path) => ops::list_dir(&path).await,
        Err(e) => Err(e.or_not_found(FsError::DirectoryNotFound)),
    };

    match listing {
        Ok(names) => http::json_response(StatusCode::OK, &names),
        Err(e) => error_response(&e, raw_path),
    }
}

/// Serve a file given its decoded path
pub async fn serve_file(
    ctx: &FileRequest<'_>,
    raw_path: &str,
    state: &AppState,
) -> Response<ResponseBody> {
    let (dir, name) = split_file_path(raw_path);
    if name.is_empty() {
        return error_response(&FsError::FileNotFound, raw_path);
    }

    let path = match state.guard.resolve_file(dir, name) {
        Ok(p) => p,
        Err(e) => return error_response(&e.or_not_found(FsError::FileNotFound), raw_path),
    };
    let file = match ops::open_file(&path).await {
        Ok(f) => f,
        Err(e) => return error_response(&e, raw_path),
    };

    let validators = Validators {
        etag: cache::metadata_etag(file.len, file.modified),
        last_modified: file.modified.map(cache::http_date),
    };

    // If-None-Match takes precedence over If-Modified-Since
    let not_modified = match ctx.if_none_match {
        Some(_) => cache::check_etag_match(ctx.if_none_match, &validators.etag),
        None => cache::not_modified_since(ctx.if_modified_since, file.modified),
    };
    if not_modified {
        return http::build_304_response(&validators);
    }

    let total = file.len;
    let content_type = mime::get_content_type(Path::new(name).extension().and_then(OsStr::to_str));

    match http::parse_range_header(ctx.range, total) {
        RangeParseResult::Valid(range) => {
            let content = if ctx.is_head {
                body::empty()
            } else {
                match file.into_reader(range.start, range.length()).await {
                    Ok(reader) => body::stream(reader),
                    Err(e) => return error_response(&e, raw_path),
                }
            };
            http::build_partial_response(content, range, total, content_type, &validators)
        }
        RangeParseResult::NotSatisfiable => http::build_416_response(total),
        RangeParseResult::None => {
            let content = if ctx.is_head {
                body::empty()
            } else {
                match file.into_reader(0, total).await {
                    Ok(reader) => body::stream(reader),
                    Err(e) => return error_response(&e, raw_path),
                }
            };
            http::build_file_response(content, total, content_type, &validators)
        }
    }
}

fn status_for(err: &FsError) -> StatusCode {
    match err {
        FsError::DirectoryNotFound | FsError::NotADirectory | FsError::FileNotFound => {
            StatusCode::NOT_FOUND
        }
        FsError::OutsideRoot { .. } => StatusCode::FORBIDDEN,
        FsError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
        FsError::Io(_) if err.is_permission_denied() => StatusCode::FORBIDDEN,
        FsError::Io(_) if err.is_not_found() => StatusCode::NOT_FOUND,
        FsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &FsError, raw_path: &str) -> Response<ResponseBody> {
    let status = status_for(err);
    match err {
        FsError::OutsideRoot { .. } => {
            logger::log_warning(&format!("Path traversal attempt blocked: {raw_path}"));
        }
        FsError::Io(e) => logger::log_error(&format!("Failed to access '{raw_path}': {e}")),
        _ => {}
    }
    http::json_message(status, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::*;
    use std::collections::HashSet;

    fn request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    fn get(uri: &str) -> Request<()> {
        request(Method::GET, uri, &[])
    }

    /// `<tmp>/clip.mp4`, `<tmp>/docs/readme.txt`, `<tmp>/docs/8月29日-副本.txt`
    fn media_dir() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("clip.mp4"), b"0123456789").unwrap();
        std::fs::create_dir(tmp.path().join("docs")).unwrap();
        std::fs::write(tmp.path().join("docs/readme.txt"), "read me").unwrap();
        std::fs::write(tmp.path().join("docs/8月29日-副本.txt"), "副本").unwrap();
        tmp
    }

    #[test]
    fn test_match_route() {
        assert_eq!(match_route("/list/a/b"), Some(Route::List("a/b")));
        assert_eq!(match_route("/list//srv"), Some(Route::List("/srv")));
        assert_eq!(match_route("/file/x.mp4"), Some(Route::File("x.mp4")));
        assert_eq!(match_route("/list/"), None);
        assert_eq!(match_route("/list"), None);
        assert_eq!(match_route("/files/x"), None);
    }

    #[tokio::test]
    async fn test_list_directory() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let resp = handle_request(&get("/list/docs"), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let names: HashSet<String> = serde_json::from_value(body_json(resp).await).unwrap();
        let expected: HashSet<String> = ["readme.txt", "8月29日-副本.txt"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_absolute_path() {
        let tmp = media_dir();
        let state = state_for(Path::new("/"));
        let uri = format!("/list/{}", tmp.path().join("docs").display());

        let resp = handle_request(&get(&uri), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_errors() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let resp = handle_request(&get("/list/clip.mp4"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["message"], "Not a directory");

        let resp = handle_request(&get("/list/missing"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["message"], "Directory does not exist");

        let resp = handle_request(&get("/list/"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["message"], "Not Found");
    }

    #[tokio::test]
    async fn test_serve_file() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let resp = handle_request(&get("/file/clip.mp4"), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "video/mp4");
        assert_eq!(resp.headers()["Content-Length"], "10");
        assert!(resp.headers().contains_key("ETag"));
        assert!(resp.headers().contains_key("Last-Modified"));
        assert_eq!(body_bytes(resp).await, "0123456789");

        let resp = handle_request(&get("/file/docs/readme.txt"), &state).await;
        assert_eq!(resp.headers()["Content-Type"], "text/plain; charset=utf-8");
        assert_eq!(body_bytes(resp).await, "read me");
    }

    #[tokio::test]
    async fn test_serve_percent_encoded_name() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let uri = "/file/docs/8%E6%9C%8829%E6%97%A5-%E5%89%AF%E6%9C%AC.txt";
        let resp = handle_request(&get(uri), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, "副本");
    }

    #[tokio::test]
    async fn test_serve_file_not_found() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        for uri in ["/file/docs/missing.txt", "/file/docs", "/file/docs/"] {
            let resp = handle_request(&get(uri), &state).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body_json(resp).await["message"], "File not found");
        }
    }

    #[tokio::test]
    async fn test_head_has_headers_without_body() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let resp = handle_request(&request(Method::HEAD, "/file/clip.mp4", &[]), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Length"], "10");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_range_requests() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let req = request(Method::GET, "/file/clip.mp4", &[("Range", "bytes=2-5")]);
        let resp = handle_request(&req, &state).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["Content-Range"], "bytes 2-5/10");
        assert_eq!(body_bytes(resp).await, "2345");

        let req = request(Method::GET, "/file/clip.mp4", &[("Range", "bytes=-3")]);
        assert_eq!(body_bytes(handle_request(&req, &state).await).await, "789");

        let req = request(Method::GET, "/file/clip.mp4", &[("Range", "bytes=50-")]);
        let resp = handle_request(&req, &state).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()["Content-Range"], "bytes */10");
    }

    #[tokio::test]
    async fn test_conditional_requests() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let resp = handle_request(&get("/file/clip.mp4"), &state).await;
        let etag = resp.headers()["ETag"].to_str().unwrap().to_string();

        let req = request(Method::GET, "/file/clip.mp4", &[("If-None-Match", &etag)]);
        let resp = handle_request(&req, &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert!(body_bytes(resp).await.is_empty());

        let req = request(
            Method::GET,
            "/file/clip.mp4",
            &[("If-Modified-Since", "Fri, 31 Dec 9999 23:59:59 GMT")],
        );
        assert_eq!(
            handle_request(&req, &state).await.status(),
            StatusCode::NOT_MODIFIED
        );

        let req = request(Method::GET, "/file/clip.mp4", &[("If-None-Match", "\"stale\"")]);
        assert_eq!(handle_request(&req, &state).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_confined_root() {
        let tmp = media_dir();
        std::fs::write(tmp.path().join("secret.txt"), "secret").unwrap();
        let state = confined_state(&tmp.path().join("docs"));

        let resp = handle_request(&get("/file/readme.txt"), &state).await;
        assert_eq!(body_bytes(resp).await, "read me");

        let resp = handle_request(&get("/file/%2E%2E/secret.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = handle_request(&get("/list/%2E%2E"), &state).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = handle_request(&get("/list/nope"), &state).await;
        assert_eq!(body_json(resp).await["message"], "Directory does not exist");
    }

    #[tokio::test]
    async fn test_methods() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let resp = handle_request(&request(Method::POST, "/list/docs", &[]), &state).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "GET, HEAD, OPTIONS");

        let resp = handle_request(&request(Method::OPTIONS, "/file/clip.mp4", &[]), &state).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_status_for_io_errors() {
        let denied = FsError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(status_for(&denied), StatusCode::FORBIDDEN);

        let missing = FsError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(status_for(&missing), StatusCode::NOT_FOUND);

        let other = FsError::Io(std::io::Error::other("disk on fire"));
        assert_eq!(status_for(&other), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_permission_denied_is_forbidden() {
        let tmp = media_dir();
        let state = state_for(tmp.path());
        let locked_file = tmp.path().join("clip.mp4");
        let locked_dir = tmp.path().join("docs");

        if !deny_read(&locked_file) {
            return;
        }
        let resp = handle_request(&get("/file/clip.mp4"), &state).await;
        restore_read(&locked_file);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(!body_json(resp).await["message"].as_str().unwrap().is_empty());

        if !deny_read(&locked_dir) {
            return;
        }
        let resp = handle_request(&get("/list/docs"), &state).await;
        restore_read(&locked_dir);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_other_io_errors_are_internal() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        // ENAMETOOLONG is neither "not found" nor "permission denied"
        let uri = format!("/file/{}", "n".repeat(300));
        let resp = handle_request(&get(&uri), &state).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_json(resp).await["message"].as_str().unwrap().is_empty());

        let uri = format!("/list/{}", "n".repeat(300));
        let resp = handle_request(&get(&uri), &state).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let tmp = media_dir();
        let state = state_for(tmp.path());

        let first = handle_request(&get("/file/docs/readme.txt"), &state).await;
        let second = handle_request(&get("/file/docs/readme.txt"), &state).await;
        assert_eq!(first.headers()["ETag"], second.headers()["ETag"]);
        assert_eq!(body_bytes(first).await, body_bytes(second).await);
    }
}
