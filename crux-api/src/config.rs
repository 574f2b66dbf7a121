//! API Configuration Module
//!
//! Bind address, CORS, logging format and the optional seed file. Loaded
//! from environment variables with development-friendly defaults.

use crate::error::{ApiError, ApiResult};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86_400;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub bind_host: String,
    pub port: u16,

    /// Allowed CORS origins. Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,

    /// JSON store snapshot loaded into the in-memory store at startup.
    pub seed_path: Option<PathBuf>,

    /// Per-request timeout. A manual ranking run is the slowest request.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            log_json: false,
            seed_path: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CRUX_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `CRUX_API_PORT`: Listen port (default: 3000)
    /// - `CRUX_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CRUX_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `CRUX_LOG_JSON`: "true" for JSON logs (default: false)
    /// - `CRUX_SEED_PATH`: Store snapshot to load at startup (default: none)
    /// - `CRUX_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
    pub fn from_env() -> ApiResult<Self> {
        let bind_host =
            std::env::var("CRUX_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("CRUX_API_PORT").ok())
        {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let cors_origins = std::env::var("CRUX_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("CRUX_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CORS_MAX_AGE_SECS);

        let log_json = std::env::var("CRUX_LOG_JSON")
            .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
            .unwrap_or(false);

        let seed_path = std::env::var("CRUX_SEED_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let request_timeout_secs = std::env::var("CRUX_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let config = Self {
            bind_host,
            port,
            cors_origins,
            cors_max_age_secs,
            log_json,
            seed_path,
            request_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Loopback-only preset for local runs and tests.
    pub fn development() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(ApiError::invalid_input(
                "CRUX_REQUEST_TIMEOUT_SECS must be positive",
            ));
        }
        self.bind_addr().map(|_| ())
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
