// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub content: ContentServiceConfig,
    pub browser: BrowserServiceConfig,
    #[serde(default)]
    pub access: AccessConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

/// Runtime configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    /// Tokio worker threads, CPU count when unset
    #[serde(default)]
    pub workers: Option<usize>,
}

/// File-content service (`POST /process`)
#[derive(Debug, Deserialize, Clone)]
pub struct ContentServiceConfig {
    pub enabled: bool,
    pub host: String,
    /// Port 0 lets the OS pick a free port
    pub port: u16,
    /// File receiving the bound port number, empty disables it
    pub port_file: String,
}

/// File-browser service (`GET /list/..`, `GET /file/..`)
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserServiceConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

/// Filesystem access policy shared by both services
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AccessConfig {
    /// Confine every request to this directory. When unset any path the
    /// process can open is reachable and relative paths resolve against the
    /// working directory.
    #[serde(default)]
    pub root: Option<String>,
}

/// Health check configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    #[serde(default = "default_health_path")]
    pub path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_path() -> String {
    "/healthz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            path: default_health_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}
