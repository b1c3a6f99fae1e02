//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration push (registry.rs):
//!     Validate every BackendHealthCheck (config.rs)
//!     → swap monitored set
//!     → cancel previous generation
//!     → spawn one BackendMonitor per backend
//!
//! Backend monitor (monitor.rs):
//!     Immediate pass, then one pass per interval tick
//!     → probe disabled servers (probe.rs); healthy → upsert into live list
//!     → probe live servers; unhealthy → remove, add to disabled set (state.rs)
//! ```
//!
//! # Design Decisions
//! - The live list is re-read from the load balancer on every pass
//! - A server is either live or disabled, never both
//! - Probe and adapter failures never stop a monitor; the next pass retries

pub mod config;
pub mod monitor;
pub mod probe;
pub mod registry;
pub mod state;

pub use config::{BackendHealthCheck, ConfigurationError, MonitoredBackends};
pub use monitor::{BackendMonitor, PassReport};
pub use probe::{HttpProber, ProbeFailure};
pub use registry::HealthRegistry;
pub use state::DisabledServers;
