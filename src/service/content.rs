//! File-content service
//!
//! `POST /process` with `{"file_path": "..."}` answers
//! `{"file_path": "...", "content": "..."}`. Every failure, including I/O
//! errors whose OS message is passed through verbatim, is a 400
//! `{"error": "..."}` except oversized bodies (413).

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use thiserror::Error;

use crate::config::AppState;
use crate::files::{ops, FsError};
use crate::http::{self, ResponseBody};
use crate::logger;

pub const ROUTE: &str = "/process";
const ALLOW: &str = "POST, OPTIONS";

/// Request body of `POST /process`
#[derive(Debug, Deserialize)]
pub struct FileReadRequest {
    pub file_path: String,
}

/// Success body of `POST /process`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct FileReadResponse {
    /// Echo of the requested path, not the resolved one
    pub file_path: String,
    pub content: String,
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl ContentError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

pub async fn handle_request<B>(req: Request<B>, state: &AppState) -> Response<ResponseBody>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    if req.uri().path() != ROUTE {
        return http::json_error(StatusCode::NOT_FOUND, "Not Found");
    }

    match *req.method() {
        Method::POST => {}
        Method::OPTIONS => {
            return http::build_options_response(ALLOW, state.config.http.enable_cors);
        }
        ref other => {
            logger::log_warning(&format!("Method not allowed on {ROUTE}: {other}"));
            return http::build_405_response(ALLOW);
        }
    }

    match read_file_content(req, state).await {
        Ok(body) => http::json_response(StatusCode::OK, &body),
        Err(e) => {
            logger::log_debug(&format!("{ROUTE} failed: {e}"));
            http::json_error(e.status(), &e.to_string())
        }
    }
}

/// Parse the body, resolve the path and read the file as text
pub async fn read_file_content<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<FileReadResponse, ContentError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let max_body_size = state.config.http.max_body_size;
    check_declared_length(&req, max_body_size)?;

    let body = read_body(req.into_body(), max_body_size).await?;
    let request: FileReadRequest = serde_json::from_slice(&body)?;

    let path = state.guard.resolve(&request.file_path)?;
    let content = ops::read_text(&path).await?;

    Ok(FileReadResponse {
        file_path: request.file_path,
        content,
    })
}

/// Reject early when `Content-Length` already exceeds the limit
fn check_declared_length<B>(req: &Request<B>, max_body_size: u64) -> Result<(), ContentError> {
    let declared = req
        .headers()
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match declared {
        Some(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Err(ContentError::PayloadTooLarge)
        }
        _ => Ok(()),
    }
}

/// Collect the body, never buffering more than the limit
async fn read_body<B>(body: B, max_body_size: u64) -> Result<Bytes, ContentError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ContentError::PayloadTooLarge)
        }
        Err(e) => Err(ContentError::Body(e.to_string())),
    }
}
