//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration: the backend pools and how to observe them.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Backend pool definitions.
    pub backends: Vec<BackendConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// A named pool of upstream servers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub name: String,

    /// Base URLs of the candidate servers (e.g., "http://10.0.0.1:8080").
    #[serde(default)]
    pub servers: Vec<String>,

    /// Active health check. Backends without one are never probed.
    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,
}

/// Health check settings of one backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path appended to each server's base URL.
    pub path: String,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Maximum probes in flight within one pass.
    pub max_concurrent_probes: usize,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            interval_ms: 10_000,
            timeout_ms: 5_000,
            max_concurrent_probes: 8,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
