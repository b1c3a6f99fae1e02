//! Startup wiring.
//!
//! Turns a validated configuration into pools and a monitored backend set.
//! Called at startup and again on every accepted reload.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::health::{BackendHealthCheck, ConfigurationError, HealthRegistry, MonitoredBackends};
use crate::load_balancer::pool::PoolDirectory;

/// Apply `config`: stop the running generation, reset pools, start a new one.
///
/// The old monitors are joined before any pool is reset, so none of them can
/// remove a server from the fresh pool contents.
pub async fn apply_config(
    registry: &HealthRegistry,
    parent: &CancellationToken,
    pools: &PoolDirectory,
    config: &ProxyConfig,
) -> Result<u64, ConfigurationError> {
    registry.cancel_current();
    registry.join_retired().await;

    let monitored = build_monitored_backends(config, pools);
    registry.set_configuration(parent, monitored)
}

/// Reconcile `pools` with `config` and build the backends to monitor.
///
/// Only backends declaring a health check are monitored.
pub fn build_monitored_backends(config: &ProxyConfig, pools: &PoolDirectory) -> MonitoredBackends {
    pools.apply(&config.backends);

    let mut monitored = MonitoredBackends::new();
    for backend in &config.backends {
        let Some(hc) = &backend.health_check else {
            tracing::debug!(backend = %backend.name, "No health check configured");
            continue;
        };
        let Some(pool) = pools.get(&backend.name) else {
            continue;
        };

        let check = BackendHealthCheck::new(hc.path.clone(), Duration::from_millis(hc.interval_ms), pool)
            .with_request_timeout(Duration::from_millis(hc.timeout_ms))
            .with_max_concurrent_probes(hc.max_concurrent_probes);
        monitored.insert(backend.name.clone(), Arc::new(check));
    }
    monitored
}
