//! Per-backend monitoring loop.
//!
//! # Responsibilities
//! - Run one reconciliation pass immediately, then one per interval tick
//! - Move failing servers out of the live list and recovered ones back in
//! - Stop when the generation's cancellation token fires
//!
//! # Design Decisions
//! - A cancelled generation never mutates the pool, even mid-pass
//! - Cancellation drops an in-flight pass at its next await point

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use futures_util::stream::{self, StreamExt};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::health::config::BackendHealthCheck;
use crate::health::probe::{HttpProber, ProbeResult};
use crate::health::state::DisabledServers;
use crate::load_balancer::DEFAULT_WEIGHT;
use crate::observability::metrics;

/// Servers that changed set during one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Disabled servers upserted back into the live list.
    pub enabled: Vec<Url>,
    /// Live servers removed and disabled.
    pub disabled: Vec<Url>,
    pub probes: usize,
}

/// Monitor of one backend. Owns the backend's disabled set.
pub struct BackendMonitor {
    name: String,
    check: Arc<BackendHealthCheck>,
    prober: HttpProber,
    disabled: DisabledServers,
    /// Generation token; once cancelled the pool is off limits.
    cancel: CancellationToken,
}

impl BackendMonitor {
    pub fn new(
        name: impl Into<String>,
        check: Arc<BackendHealthCheck>,
        prober: HttpProber,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            check,
            prober,
            disabled: DisabledServers::new(),
            cancel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn disabled(&self) -> &DisabledServers {
        &self.disabled
    }

    /// Run until the generation token fires.
    pub async fn run(mut self) {
        let cancel = self.cancel.clone();
        if cancel.is_cancelled() {
            tracing::debug!(backend = %self.name, "Monitor cancelled before start");
            return;
        }

        tracing::debug!(backend = %self.name, check = %self.check, "Initial health check");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(backend = %self.name, "Stopping health monitor");
                return;
            }
            _ = self.reconcile() => {}
        }

        let interval = self.check.interval;
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(backend = %self.name, "Stopping health monitor");
                    break;
                }
                _ = ticker.tick() => {
                    tracing::debug!(backend = %self.name, "Refreshing health check");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!(backend = %self.name, "Stopping health monitor mid-pass");
                            break;
                        }
                        _ = self.reconcile() => {}
                    }
                }
            }
        }
    }

    fn superseded(&self) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!(backend = %self.name, "Generation superseded, leaving pool untouched");
            return true;
        }
        false
    }

    /// One full pass: re-check disabled servers, then the live list.
    pub async fn reconcile(&mut self) -> PassReport {
        let started = Instant::now();
        let mut report = PassReport::default();

        let candidates = dedup(self.disabled.take());
        let checked: HashSet<Url> = candidates.iter().cloned().collect();
        let results = self.probe_all(candidates).await;
        if self.superseded() {
            return report;
        }
        for (url, result) in results {
            report.probes += 1;
            match result {
                Ok(()) => match self.check.lb.upsert_server(&url, DEFAULT_WEIGHT) {
                    Ok(()) => {
                        tracing::info!(backend = %self.name, server = %url, "Health check is up, server re-enabled");
                        metrics::record_transition(&self.name, "enabled");
                        report.enabled.push(url);
                    }
                    Err(e) => {
                        tracing::warn!(backend = %self.name, server = %url, error = %e, "Failed to re-enable server, keeping it disabled");
                        self.disabled.insert(url);
                    }
                },
                Err(failure) => {
                    tracing::warn!(backend = %self.name, server = %url, reason = %failure, "Health check is still failing");
                    self.disabled.insert(url);
                }
            }
        }

        let live: Vec<Url> = dedup(self.check.lb.servers())
            .into_iter()
            .filter(|url| !checked.contains(url))
            .collect();
        let results = self.probe_all(live).await;
        if self.superseded() {
            return report;
        }
        for (url, result) in results {
            report.probes += 1;
            let Err(failure) = result else { continue };

            tracing::warn!(backend = %self.name, server = %url, reason = %failure, "Health check has failed, removing server");
            match self.check.lb.remove_server(&url) {
                Ok(()) => {
                    metrics::record_transition(&self.name, "disabled");
                    self.disabled.insert(url.clone());
                    report.disabled.push(url);
                }
                Err(e) => {
                    tracing::warn!(backend = %self.name, server = %url, error = %e, "Failed to remove server, retrying next pass");
                }
            }
        }

        metrics::record_pass(&self.name, self.disabled.len(), started);
        tracing::debug!(
            backend = %self.name,
            probes = report.probes,
            enabled = report.enabled.len(),
            disabled = report.disabled.len(),
            elapsed = ?started.elapsed(),
            "Health check pass complete"
        );
        report
    }

    /// Probe distinct URLs with bounded concurrency, results in input order.
    async fn probe_all(&self, urls: Vec<Url>) -> Vec<(Url, ProbeResult)> {
        let prober = &self.prober;
        let check = &self.check;
        let name = &self.name;

        stream::iter(urls)
            .map(|url| async move {
                let result = prober.probe(&url, &check.path, check.request_timeout).await;
                metrics::record_probe(name, result.is_ok());
                (url, result)
            })
            .buffered(check.max_concurrent_probes)
            .collect()
            .await
    }
}

fn dedup(urls: Vec<Url>) -> Vec<Url> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}
