//! Backend health monitoring for a reverse proxy.
//!
//! Probes the servers of each backend pool and adds or removes them from the
//! pool's live list so traffic only reaches servers passing a liveness check.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::ProxyConfig;
pub use health::{BackendHealthCheck, HealthRegistry, MonitoredBackends};
pub use lifecycle::Shutdown;
pub use load_balancer::{LoadBalancer, LoadBalancerError};
