//! Monitoring registry.
//!
//! # Responsibilities
//! - Hold the currently monitored backend set
//! - On reconfiguration, cancel the previous generation and start a new one
//! - Join outstanding monitor tasks on request
//!
//! # Design Decisions
//! - Each generation owns a child CancellationToken and a JoinSet
//! - Reconfiguration only signals the old generation; joining is separate
//! - Callers that reset pools first stop and join the old generation
//! - A mutex serializes reconfigurations; readers of the set use ArcSwap

use std::sync::{Arc, Mutex, OnceLock};
use arc_swap::ArcSwap;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::health::config::{ConfigurationError, MonitoredBackends};
use crate::health::monitor::BackendMonitor;
use crate::health::probe::HttpProber;

static GLOBAL: OnceLock<HealthRegistry> = OnceLock::new();

/// Registry of the monitored backends and their running monitors.
pub struct HealthRegistry {
    prober: HttpProber,
    backends: ArcSwap<MonitoredBackends>,
    state: Mutex<Generations>,
}

#[derive(Default)]
struct Generations {
    current: u64,
    cancel: Option<CancellationToken>,
    tasks: JoinSet<()>,
    /// Cancelled generations whose tasks have not been joined yet.
    retired: Vec<JoinSet<()>>,
}

impl HealthRegistry {
    pub fn new(prober: HttpProber) -> Self {
        Self {
            prober,
            backends: ArcSwap::from_pointee(MonitoredBackends::new()),
            state: Mutex::new(Generations::default()),
        }
    }

    /// Process-wide registry, constructed on first successful use.
    pub fn global() -> Result<&'static HealthRegistry, reqwest::Error> {
        if let Some(registry) = GLOBAL.get() {
            return Ok(registry);
        }
        let prober = HttpProber::new()?;
        Ok(GLOBAL.get_or_init(|| HealthRegistry::new(prober)))
    }

    /// Replace the monitored set and start a new generation of monitors.
    ///
    /// Every entry is validated first; on error nothing changes. The previous
    /// generation is cancelled but not awaited. Must be called from within a
    /// Tokio runtime. Returns the new generation number.
    pub fn set_configuration(
        &self,
        parent: &CancellationToken,
        backends: MonitoredBackends,
    ) -> Result<u64, ConfigurationError> {
        for (name, check) in &backends {
            check.validate(name)?;
        }

        let mut state = self.state.lock().expect("health registry mutex poisoned");

        let backends = Arc::new(backends);
        self.backends.store(backends.clone());

        retire(&mut state);

        let cancel = parent.child_token();
        for (name, check) in backends.iter() {
            let monitor = BackendMonitor::new(name.clone(), check.clone(), self.prober.clone(), cancel.clone());
            state.tasks.spawn(monitor.run());
        }

        state.cancel = Some(cancel);
        state.current += 1;
        tracing::info!(
            generation = state.current,
            backends = backends.len(),
            "Health check configuration applied"
        );
        Ok(state.current)
    }

    /// Cancel the current generation without starting a new one.
    ///
    /// Its monitors stop touching their pools at once; `join_retired` waits
    /// for them to exit. The monitored set and generation number are kept.
    pub fn cancel_current(&self) {
        let mut state = self.state.lock().expect("health registry mutex poisoned");
        retire(&mut state);
    }

    /// Currently monitored backends.
    pub fn backends(&self) -> Arc<MonitoredBackends> {
        self.backends.load_full()
    }

    /// Number of the current generation; 0 before the first configuration.
    pub fn generation(&self) -> u64 {
        self.state.lock().expect("health registry mutex poisoned").current
    }

    /// Monitors of the current generation that have not exited.
    pub fn running_monitors(&self) -> usize {
        let mut state = self.state.lock().expect("health registry mutex poisoned");
        while let Some(result) = state.tasks.try_join_next() {
            log_exit(result);
        }
        state.tasks.len()
    }

    /// Wait for every monitor of superseded generations to exit.
    pub async fn join_retired(&self) {
        let retired = {
            let mut state = self.state.lock().expect("health registry mutex poisoned");
            std::mem::take(&mut state.retired)
        };
        join_all(retired).await;
    }

    /// Cancel the current generation and wait for every monitor to exit.
    ///
    /// The monitored set is cleared; a later `set_configuration` starts afresh.
    pub async fn shutdown(&self) {
        let sets = {
            let mut state = self.state.lock().expect("health registry mutex poisoned");
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            let mut sets = std::mem::take(&mut state.retired);
            sets.push(std::mem::take(&mut state.tasks));
            sets
        };
        self.backends.store(Arc::new(MonitoredBackends::new()));

        join_all(sets).await;
        tracing::info!("Health monitors stopped");
    }
}

fn retire(state: &mut Generations) {
    if let Some(cancel) = state.cancel.take() {
        cancel.cancel();
    }
    let previous = std::mem::take(&mut state.tasks);
    if !previous.is_empty() {
        state.retired.push(previous);
    }
    reap_retired(&mut state.retired);
}

async fn join_all(sets: Vec<JoinSet<()>>) {
    for mut set in sets {
        while let Some(result) = set.join_next().await {
            log_exit(result);
        }
    }
}

fn reap_retired(retired: &mut Vec<JoinSet<()>>) {
    for set in retired.iter_mut() {
        while let Some(result) = set.try_join_next() {
            log_exit(result);
        }
    }
    retired.retain(|set| !set.is_empty());
}

fn log_exit(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Health monitor panicked");
        }
    }
}
