//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval and timeout > 0)
//! - Check server addresses and backend name uniqueness
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("backend #{index} has an empty name")]
    EmptyBackendName { index: usize },

    #[error("backend '{0}' is defined more than once")]
    DuplicateBackend(String),

    #[error("backend '{backend}': invalid server URL '{server}': {reason}")]
    InvalidServer { backend: String, server: String, reason: String },

    #[error("backend '{0}': health check interval must be greater than 0")]
    ZeroInterval(String),

    #[error("backend '{0}': health check timeout must be greater than 0")]
    ZeroTimeout(String),

    #[error("backend '{0}': max_concurrent_probes must be greater than 0")]
    ZeroConcurrency(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (index, backend) in config.backends.iter().enumerate() {
        if backend.name.trim().is_empty() {
            errors.push(ValidationError::EmptyBackendName { index });
        } else if !names.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.name.clone()));
        }

        for server in &backend.servers {
            if let Err(reason) = check_server_url(server) {
                errors.push(ValidationError::InvalidServer {
                    backend: backend.name.clone(),
                    server: server.clone(),
                    reason,
                });
            }
        }

        if let Some(hc) = &backend.health_check {
            if hc.interval_ms == 0 {
                errors.push(ValidationError::ZeroInterval(backend.name.clone()));
            }
            if hc.timeout_ms == 0 {
                errors.push(ValidationError::ZeroTimeout(backend.name.clone()));
            }
            if hc.max_concurrent_probes == 0 {
                errors.push(ValidationError::ZeroConcurrency(backend.name.clone()));
            }
        }
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_server_url(server: &str) -> Result<(), String> {
    let url = Url::parse(server).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
