//! Shutdown coordination.

use tokio_util::sync::CancellationToken;

/// Coordinator for graceful shutdown.
///
/// Holds the root cancellation token; every health registry generation
/// derives a child token from it, so triggering shutdown cancels them all.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    root: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root token to derive generation tokens from.
    pub fn token(&self) -> &CancellationToken {
        &self.root
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.root.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Resolves once shutdown is triggered.
    pub async fn wait(&self) {
        self.root.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_cancels_children() {
        let shutdown = Shutdown::new();
        let child = shutdown.token().child_token();
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        shutdown.wait().await;
        assert!(child.is_cancelled());
    }
}
