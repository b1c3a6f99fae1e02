//! Per-backend health check options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::load_balancer::LoadBalancer;

/// Request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Probes in flight per pass when none is configured.
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 8;

/// Backend name → health check. Replacing it supersedes the previous set.
pub type MonitoredBackends = BTreeMap<String, Arc<BackendHealthCheck>>;

/// A backend health check rejected before any monitor is started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("backend '{0}': probe interval must be greater than 0")]
    NonPositiveInterval(String),

    #[error("backend '{0}': request timeout must be greater than 0")]
    NonPositiveTimeout(String),

    #[error("backend '{0}': at least one concurrent probe is required")]
    NoProbeConcurrency(String),
}

/// Health check of one backend. Immutable once built.
#[derive(Debug, Clone)]
pub struct BackendHealthCheck {
    /// Path appended to every server base URL.
    pub path: String,
    pub interval: Duration,
    pub request_timeout: Duration,
    pub max_concurrent_probes: usize,
    /// Live server list of the backend.
    pub lb: Arc<dyn LoadBalancer>,
}

impl BackendHealthCheck {
    pub fn new(path: impl Into<String>, interval: Duration, lb: Arc<dyn LoadBalancer>) -> Self {
        Self {
            path: path.into(),
            interval,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_probes: DEFAULT_MAX_CONCURRENT_PROBES,
            lb,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_probes(mut self, max: usize) -> Self {
        self.max_concurrent_probes = max;
        self
    }

    /// Reject settings a monitor loop could not run with.
    pub fn validate(&self, backend: &str) -> Result<(), ConfigurationError> {
        if self.interval.is_zero() {
            return Err(ConfigurationError::NonPositiveInterval(backend.to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigurationError::NonPositiveTimeout(backend.to_string()));
        }
        if self.max_concurrent_probes == 0 {
            return Err(ConfigurationError::NoProbeConcurrency(backend.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for BackendHealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[path: {} interval: {:?} timeout: {:?}]",
            self.path, self.interval, self.request_timeout
        )
    }
}
