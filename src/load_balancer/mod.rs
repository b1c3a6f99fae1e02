//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Health monitor pass
//!     → LoadBalancer::servers() (authoritative live list, queried fresh)
//!     → probe each server
//!     → LoadBalancer::upsert_server() / remove_server()
//!     → pool.rs (ServerPool mutates its weighted list)
//! ```
//!
//! # Design Decisions
//! - The monitor never caches the live list; the pool is the source of truth
//! - Mutations are idempotent so a pass can safely repeat them
//! - The pool guards its own state; monitors sharing a pool need no locking

use std::fmt;
use url::Url;

pub mod pool;

/// Weight given to a server re-enabled by the health monitor.
pub const DEFAULT_WEIGHT: u32 = 1;

/// Error returned by a load balancer mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadBalancerError {
    #[error("invalid weight {weight} for server {url}")]
    InvalidWeight { url: Url, weight: u32 },

    #[error("load balancer unavailable: {0}")]
    Unavailable(String),
}

/// Mutation surface of a backend's live server list.
///
/// Implementations must be safe to call from several monitor tasks at once.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Current live list.
    fn servers(&self) -> Vec<Url>;

    /// Add `url` with `weight`, or update the weight if already present.
    fn upsert_server(&self, url: &Url, weight: u32) -> Result<(), LoadBalancerError>;

    /// Remove `url`. Removing an absent server is not an error.
    fn remove_server(&self, url: &Url) -> Result<(), LoadBalancerError>;
}
