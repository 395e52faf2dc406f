// Configuration module entry point
// Layered loading: built-in defaults, optional file, BRIDGE_* environment

mod state;
mod types;

use config::builder::DefaultState;
use config::ConfigBuilder;
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    AccessConfig, BrowserServiceConfig, Config, ContentServiceConfig, HealthConfig, HttpConfig,
    LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Port file name expected by existing front-end callers
pub const DEFAULT_PORT_FILE: &str = "flask_port.txt";

impl Config {
    /// Load configuration from specified file path (extension optional)
    /// Missing files are not an error; defaults and environment still apply
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = with_defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("BRIDGE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Built-in defaults only, ignoring files and environment
    pub fn defaults() -> Result<Self, config::ConfigError> {
        with_defaults()?.build()?.try_deserialize()
    }

    pub fn content_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.content.host, self.content.port)
            .parse()
            .map_err(|e| format!("Invalid content service address: {e}"))
    }

    pub fn browser_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.browser.host, self.browser.port)
            .parse()
            .map_err(|e| format!("Invalid browser service address: {e}"))
    }
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("content.enabled", true)?
        .set_default("content.host", "0.0.0.0")?
        .set_default("content.port", 0)?
        .set_default("content.port_file", DEFAULT_PORT_FILE)?
        .set_default("browser.enabled", true)?
        .set_default("browser.host", "0.0.0.0")?
        .set_default("browser.port", 8000)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.write_timeout", 30)?
        .set_default("http.server_name", "file-bridge/0.1")?
        .set_default("http.enable_cors", false)?
        .set_default("http.max_body_size", 1_048_576) // 1MB
}
