//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Health monitors produce:
//!     → tracing events (start/stop/tick at debug, unhealthy at warn)
//!     → metrics.rs (probe counters, transitions, pass latency)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
