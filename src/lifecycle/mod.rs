//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build pools → Start health registry generation
//!
//! Reload:
//!     Watcher emits config → startup.rs rebuilds → new generation
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → cancel root token → join all monitors → exit
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
