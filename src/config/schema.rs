//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or missing) config file works.

use serde::{Deserialize, Serialize};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener and request-handling settings.
    pub server: ServerConfig,

    /// Per-client rate limiting.
    pub limiter: LimiterConfig,

    /// Cross-origin resource sharing.
    pub cors: CorsConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Movie endpoint behavior.
    pub movies: MoviesConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,

    /// Deployment environment name; "production" switches logs to JSON.
    pub environment: String,

    /// Total per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,

    /// Deadline for draining in-flight requests and background tasks on
    /// shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            environment: "development".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1_048_576,
            shutdown_grace_secs: 5,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Enable rate limiting; disabled means every request is admitted.
    pub enabled: bool,

    /// Steady-state refill rate in requests per second, per client.
    pub rps: f64,

    /// Burst capacity per client.
    pub burst: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 2.0,
            burst: 4,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to read responses; matched exactly, no wildcards.
    pub trusted_origins: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Scrape endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Movie endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MoviesConfig {
    /// Radix used when comparing a movie's version against the
    /// `X-Expected-Version` header: 10 or 32.
    pub version_header_base: u32,
}

impl Default for MoviesConfig {
    fn default() -> Self {
        Self {
            version_header_base: 10,
        }
    }
}
