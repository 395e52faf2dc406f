use std::sync::Arc;

use file_bridge::config::{AppState, Config};
use file_bridge::logger;
use file_bridge::server::{self, SignalHandler};
use file_bridge::service::ServiceKind;

/// Config file used when no path is given on the command line (extension optional)
const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Tokio runtime sized by server.workers
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    logger::log_runtime(cfg.server.workers);

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&cfg)?);
    if !state.guard.is_confined() {
        logger::log_unconfined_access(state.guard.base());
    }

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local.run_until(run_services(cfg, state)).await
}

async fn run_services(
    cfg: Config,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    let mut services = Vec::new();

    if cfg.content.enabled {
        let listener = server::bind_listener(cfg.content_socket_addr()?)?;
        let addr = listener.local_addr()?;
        server::publish_port(&cfg.content.port_file, addr.port())?;
        services.push((ServiceKind::Content, listener, addr));
    }

    if cfg.browser.enabled {
        let listener = server::bind_listener(cfg.browser_socket_addr()?)?;
        let addr = listener.local_addr()?;
        services.push((ServiceKind::Browser, listener, addr));
    }

    if services.is_empty() {
        return Err("no service enabled: set content.enabled or browser.enabled".into());
    }

    let tasks: Vec<_> = services
        .into_iter()
        .map(|(kind, listener, addr)| {
            logger::log_service_start(kind.name(), &addr, &cfg.logging);
            tokio::task::spawn_local(server::start_server_loop(
                listener,
                kind,
                Arc::clone(&state),
                Arc::clone(&signals),
            ))
        })
        .collect();

    for task in tasks {
        task.await??;
    }
    Ok(())
}
