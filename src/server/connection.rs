// Connection module
// Accepts a single TCP connection and serves it with the listener's service

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::Instant;

use super::activity::{Activity, ConnectionLimits, TrackedBody, TrackedStream, Verdict};

use crate::config::AppState;
use crate::logger;
use crate::service::{self, ServiceKind};

/// Reserve a connection slot; `false` means the limit is reached.
///
/// The counter is incremented first and rolled back on rejection so two
/// concurrent accepts cannot both slip under the limit.
pub fn try_acquire_slot(counter: &AtomicUsize, max_connections: Option<u64>) -> bool {
    let prev_count = counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            return false;
        }
    }
    true
}

/// Accept and process a connection, checking limits and logging.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    kind: ServiceKind,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    if !try_acquire_slot(conn_counter, state.config.performance.max_connections) {
        drop(stream);
        return;
    }

    logger::log_connection_accepted(kind.name(), &peer_addr);

    handle_connection(
        stream,
        peer_addr,
        kind,
        Arc::clone(state),
        Arc::clone(conn_counter),
    );
}

/// Serve one connection on the current `LocalSet`.
///
/// hyper bounds how long a request head may take to arrive. A watchdog
/// closes the connection gracefully once it has been idle for the
/// keep-alive timeout, and drops it when an in-flight response has made
/// no progress for the write timeout. A transfer that keeps moving bytes
/// is never interrupted. The slot is released when the connection ends.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    kind: ServiceKind,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::task::spawn_local(async move {
        let limits = ConnectionLimits::from_config(&state.config.performance);
        let activity = Activity::new();
        let io = TokioIo::new(TrackedStream::new(stream, activity.clone()));

        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new());
        builder.keep_alive(limits.keep_alive.is_some());
        if let Some(timeout) = limits.header_read {
            builder.header_read_timeout(timeout);
        }

        let service_state = Arc::clone(&state);
        let service_activity = activity.clone();
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let guard = service_activity.begin_response();
                let state = Arc::clone(&service_state);
                async move {
                    let response = service::handle_request(kind, req, state, peer_addr).await?;
                    Ok::<_, Infallible>(response.map(|body| TrackedBody::new(body, guard)))
                }
            }),
        );
        tokio::pin!(conn);

        let mut closing = false;
        loop {
            let deadline = limits.next_deadline(activity.in_flight(), activity.last_io(), closing);

            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(err) = result {
                        logger::log_connection_error(&err);
                    }
                    break;
                }

                () = sleep_until(deadline) => {
                    let since_io = activity.last_io().elapsed();
                    match limits.check(activity.in_flight(), since_io) {
                        Verdict::Active => {}
                        Verdict::Idle => {
                            if !closing {
                                conn.as_mut().graceful_shutdown();
                                closing = true;
                            }
                        }
                        Verdict::Stalled => {
                            logger::log_warning(&format!(
                                "[{}] Dropping connection from {peer_addr}: no progress for {} seconds",
                                kind.name(),
                                since_io.as_secs(),
                            ));
                            break;
                        }
                    }
                }
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_limit() {
        let counter = AtomicUsize::new(0);
        assert!(try_acquire_slot(&counter, Some(2)));
        assert!(try_acquire_slot(&counter, Some(2)));
        assert!(!try_acquire_slot(&counter, Some(2)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        counter.fetch_sub(1, Ordering::SeqCst);
        assert!(try_acquire_slot(&counter, Some(2)));
    }

    #[test]
    fn test_unlimited_slots() {
        let counter = AtomicUsize::new(0);
        for _ in 0..100 {
            assert!(try_acquire_slot(&counter, None));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }
}
