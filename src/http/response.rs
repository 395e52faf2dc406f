//! HTTP response building module
//!
//! Builders for every response shape the services produce. None of them
//! panic: a builder failure is logged and replaced by a bare response.

use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::body::{self, ResponseBody};
use super::range::ByteRange;

/// Cache validators sent with file responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    pub etag: String,
    pub last_modified: Option<String>,
}

/// Serialize `body` as a JSON response
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<ResponseBody> {
    let json = match serde_json::to_vec(value) {
        Ok(j) => j,
        Err(e) => {
            log_build_error("JSON", &e);
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .body(body::full(Bytes::from_static(
                    br#"{"message":"Internal server error"}"#,
                )))
                .unwrap_or_else(|_| Response::new(body::empty()));
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body::full(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(body::empty())
        })
}

/// `{"message": ...}`, the error shape of the browser service
pub fn json_message(status: StatusCode, message: &str) -> Response<ResponseBody> {
    json_response(status, &serde_json::json!({ "message": message }))
}

/// `{"error": ...}`, the error shape of the content service
pub fn json_error(status: StatusCode, message: &str) -> Response<ResponseBody> {
    json_response(status, &serde_json::json!({ "error": message }))
}

/// Build health check response
pub fn build_health_response(status: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", "no-cache, no-store")
        .body(body::full(Bytes::from(status.to_string())))
        .unwrap_or_else(|e| {
            log_build_error("health", &e);
            Response::new(body::empty())
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain")
        .header("Allow", allow)
        .body(body::full(Bytes::from_static(b"405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(body::empty())
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(allow: &str, enable_cors: bool) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", allow);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", allow)
            .header("Access-Control-Allow-Headers", "Content-Type, Range")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(body::empty()).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(body::empty())
    })
}

/// Build 304 Not Modified response
pub fn build_304_response(validators: &Validators) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", &validators.etag);
    if let Some(ref last_modified) = validators.last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }

    builder.body(body::empty()).unwrap_or_else(|e| {
        log_build_error("304", &e);
        Response::new(body::empty())
    })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Type", "text/plain")
        .header("Content-Range", format!("bytes */{file_size}"))
        .body(body::full(Bytes::from_static(b"Range Not Satisfiable")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(body::empty())
        })
}

/// Build 200 response carrying a whole file. For HEAD `content` is empty and
/// `content_length` still reports the file size.
pub fn build_file_response(
    content: ResponseBody,
    content_length: u64,
    content_type: &str,
    validators: &Validators,
) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("Accept-Ranges", "bytes")
        .header("ETag", &validators.etag)
        .header("Cache-Control", "no-cache");
    if let Some(ref last_modified) = validators.last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }

    builder.body(content).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(body::empty())
    })
}

/// Build 206 Partial Content response
pub fn build_partial_response(
    content: ResponseBody,
    range: ByteRange,
    total_size: u64,
    content_type: &str,
    validators: &Validators,
) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header("Content-Type", content_type)
        .header("Content-Length", range.length())
        .header("Content-Range", range.content_range(total_size))
        .header("Accept-Ranges", "bytes")
        .header("ETag", &validators.etag)
        .header("Cache-Control", "no-cache");
    if let Some(ref last_modified) = validators.last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }

    builder.body(content).unwrap_or_else(|e| {
        log_build_error("206", &e);
        Response::new(body::empty())
    })
}

/// Log response build error
fn log_build_error(status: &str, error: &dyn std::fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
