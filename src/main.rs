//! Backend health monitor (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ loader/validation ──▶ startup ──▶ HealthRegistry
//!        │                                   │            │ one task per backend
//!        ▼                                   ▼            ▼
//!   ConfigWatcher ── reload ──▶ new generation      BackendMonitor ──▶ HttpProber
//!                                                         │
//!                                                         ▼
//!                                             ServerPool (live server list)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;

use backend_health::config::{load_config, watcher::ConfigWatcher, ProxyConfig};
use backend_health::health::{HealthRegistry, HttpProber};
use backend_health::lifecycle::{signals, startup, Shutdown};
use backend_health::load_balancer::pool::PoolDirectory;
use backend_health::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "backend-health")]
#[command(about = "Active health checking for backend server pools", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "backend-health.toml")]
    config: PathBuf,

    /// Reload the configuration when the file changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!(
        path = ?cli.config,
        backends = config.backends.len(),
        "backend-health v0.1.0 starting"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(error = %e, "Failed to start metrics endpoint");
        }
    }

    let shutdown = Shutdown::new();
    let pools = PoolDirectory::new();
    let registry = Arc::new(HealthRegistry::new(HttpProber::new()?));

    apply(&registry, &shutdown, &pools, &config).await;

    // The watcher handle must outlive the loop.
    let (_watcher, mut updates) = if cli.watch {
        let (watcher, rx) = ConfigWatcher::new(&cli.config);
        (Some(watcher.run()?), Some(rx))
    } else {
        (None, None)
    };

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        signal_shutdown.trigger();
    });

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            Some(new_config) = next_update(&mut updates) => {
                apply(&registry, &shutdown, &pools, &new_config).await;
            }
        }
    }

    registry.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn apply(registry: &HealthRegistry, shutdown: &Shutdown, pools: &PoolDirectory, config: &ProxyConfig) {
    if let Err(e) = startup::apply_config(registry, shutdown.token(), pools, config).await {
        tracing::error!(error = %e, "Rejected health check configuration");
    }
}

/// Next reloaded config; pends forever when not watching.
async fn next_update(updates: &mut Option<UnboundedReceiver<ProxyConfig>>) -> Option<ProxyConfig> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
