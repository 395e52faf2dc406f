// Application state module
// Process-wide, immutable after startup; shared by both services

use std::io;

use super::types::Config;
use crate::files::PathGuard;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Resolves request paths against the base directory and the optional root
    pub guard: PathGuard,
}

impl AppState {
    /// Build state from configuration, resolving the access root once
    pub fn new(config: &Config) -> io::Result<Self> {
        let guard = PathGuard::from_config(&config.access)?;

        Ok(Self {
            config: config.clone(),
            guard,
        })
    }

    /// Build state around an explicit guard
    pub fn with_guard(config: &Config, guard: PathGuard) -> Self {
        Self {
            config: config.clone(),
            guard,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
