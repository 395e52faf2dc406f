//! Request handling for the two HTTP services
//!
//! Each listener is bound to exactly one `ServiceKind`; the dispatcher here
//! adds what both services share (health check, `Server` header, CORS origin,
//! access log) around the service-specific handler.

pub mod browser;
pub mod content;

use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, SERVER};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};

/// Which service a listener serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// `POST /process`: read a file as text
    Content,
    /// `GET /list/..` and `GET /file/..`
    Browser,
}

impl ServiceKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Browser => "browser",
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    kind: ServiceKind,
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let access_entry = state
        .access_log_enabled()
        .then(|| access_entry_for(kind, &req, peer_addr));

    let mut response = if is_health_check(&req, &state) {
        http::build_health_response("ok")
    } else {
        match kind {
            ServiceKind::Content => content::handle_request(req, &state).await,
            ServiceKind::Browser => browser::handle_request(&req, &state).await,
        }
    };

    decorate(&mut response, &state);

    if let Some(mut entry) = access_entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = body_length(&response);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Bytes the body will carry; streamed bodies only know it from `Content-Length`
fn body_length(response: &Response<ResponseBody>) -> u64 {
    response
        .body()
        .size_hint()
        .exact()
        .or_else(|| {
            response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        })
        .unwrap_or(0)
}

fn is_health_check<B>(req: &Request<B>, state: &AppState) -> bool {
    let health = &state.config.health;
    health.enabled
        && req.uri().path() == health.path
        && matches!(*req.method(), Method::GET | Method::HEAD)
}

/// Headers every response carries
fn decorate(response: &mut Response<ResponseBody>, state: &AppState) {
    let headers = response.headers_mut();
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        headers.insert(SERVER, server);
    }
    if state.config.http.enable_cors {
        headers
            .entry(ACCESS_CONTROL_ALLOW_ORIGIN)
            .or_insert(HeaderValue::from_static("*"));
    }
}

fn access_entry_for<B>(kind: ServiceKind, req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        kind.name(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version())
        .trim_start_matches("HTTP/")
        .to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}
