//! Configuration validation.
//!
//! Semantic checks on a syntactically valid config; returns every violation
//! rather than just the first.

use std::net::SocketAddr;

use crate::config::schema::ApiConfig;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn error(field: &str, message: &str) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(error("server.bind_address", "must be a valid socket address"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(error("server.request_timeout_secs", "must be greater than zero"));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(error("server.max_body_bytes", "must be greater than zero"));
    }

    if config.limiter.enabled {
        if !(config.limiter.rps > 0.0) {
            errors.push(error("limiter.rps", "must be greater than zero when enabled"));
        }
        if config.limiter.burst == 0 {
            errors.push(error("limiter.burst", "must be at least 1 when enabled"));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(error(
            "observability.metrics_address",
            "must be a valid socket address",
        ));
    }

    for origin in &config.cors.trusted_origins {
        if origin.is_empty() || origin.chars().any(char::is_whitespace) {
            errors.push(error("cors.trusted_origins", "origins must be non-empty and unpadded"));
            break;
        }
    }

    if !matches!(config.movies.version_header_base, 10 | 32) {
        errors.push(error("movies.version_header_base", "must be 10 or 32"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
