// Server loop module
// Accepts connections for one service until shutdown is requested

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;
use crate::service::ServiceKind;

/// Accept loop for a single listener
///
/// Each listener keeps its own connection counter, so `max_connections`
/// applies per service. In-flight connections are left to finish on the
/// `LocalSet` after the loop returns.
///
/// # Errors
///
/// Currently always returns `Ok(())` once shutdown is requested; accept errors
/// are logged and the loop keeps going.
pub async fn start_server_loop(
    listener: TcpListener,
    kind: ServiceKind,
    state: Arc<AppState>,
    signals: Arc<SignalHandler>,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    // Registered before the first check so a notify in between is not missed
    let shutdown = signals.shutdown.notified();
    tokio::pin!(shutdown);
    shutdown.as_mut().enable();

    if signals.is_shutdown_requested() {
        logger::log_shutdown(kind.name());
        return Ok(());
    }

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, kind, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!(
                            "[{}] Failed to accept connection: {e}",
                            kind.name()
                        ));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown(kind.name());
                return Ok(());
            }
        }
    }
}
