//! Runtime configuration, read from the environment with CLI overrides.

use std::path::PathBuf;
use std::time::Duration;

use crate::store::StoreError;

/// Default API base URL (the server mounts everything under `/api`).
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8000/api";

const HOME_DIR: &str = ".deskbot";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote store, without a trailing slash.
    pub server: String,

    /// Directory holding the local state file. `None` when neither
    /// `DESKBOT_HOME` nor a user home directory is available.
    pub home: Option<PathBuf>,

    /// `tracing` filter string, e.g. `"warn"` or `"deskbot=debug"`.
    pub log_level: String,

    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,

    /// Interval between liveness probes in interactive mode.
    pub probe_interval: Duration,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            server: normalize_server(&env_or("DESKBOT_SERVER", DEFAULT_SERVER)),
            home: std::env::var("DESKBOT_HOME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map_or_else(default_home, |v| Some(PathBuf::from(v))),
            log_level: env_or("DESKBOT_LOG", "warn"),
            request_timeout: Duration::from_secs(parse_env("DESKBOT_TIMEOUT_SECS", 60)),
            probe_interval: Duration::from_secs(parse_env("DESKBOT_PROBE_SECS", 30).max(1)),
        }
    }

    /// Apply a `--server` override.
    #[must_use]
    pub fn with_server(mut self, server: Option<&str>) -> Self {
        if let Some(server) = server {
            self.server = normalize_server(server);
        }
        self
    }

    /// Path of the local state file.
    pub fn state_file(&self) -> Result<PathBuf, StoreError> {
        self.home
            .as_ref()
            .map(|home| home.join("state.json"))
            .ok_or(StoreError::NoHome)
    }
}

fn default_home() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(HOME_DIR))
}

fn normalize_server(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
