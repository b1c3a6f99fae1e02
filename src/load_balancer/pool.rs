//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the weighted live server list of one backend
//! - Group pools by backend name and reconcile them with configuration

use std::sync::{Arc, Mutex};
use dashmap::DashMap;
use url::Url;

use crate::config::BackendConfig;
use crate::load_balancer::{LoadBalancer, LoadBalancerError, DEFAULT_WEIGHT};

/// A server in the live list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedServer {
    pub url: Url,
    pub weight: u32,
}

/// In-memory live server list for one backend.
#[derive(Debug, Default)]
pub struct ServerPool {
    servers: Mutex<Vec<WeightedServer>>,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with every server live at the default weight.
    pub fn with_servers(urls: impl IntoIterator<Item = Url>) -> Self {
        let pool = Self::new();
        pool.reset(urls);
        pool
    }

    /// Replace the live list with `urls`, dropping duplicates.
    pub fn reset(&self, urls: impl IntoIterator<Item = Url>) {
        let mut servers = self.servers.lock().expect("server pool mutex poisoned");
        servers.clear();
        for url in urls {
            if !servers.iter().any(|s| s.url == url) {
                servers.push(WeightedServer { url, weight: DEFAULT_WEIGHT });
            }
        }
    }

    /// Snapshot of the live list with weights.
    pub fn weighted_servers(&self) -> Vec<WeightedServer> {
        self.servers.lock().expect("server pool mutex poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.servers.lock().expect("server pool mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LoadBalancer for ServerPool {
    fn servers(&self) -> Vec<Url> {
        self.servers
            .lock()
            .expect("server pool mutex poisoned")
            .iter()
            .map(|s| s.url.clone())
            .collect()
    }

    fn upsert_server(&self, url: &Url, weight: u32) -> Result<(), LoadBalancerError> {
        if weight == 0 {
            return Err(LoadBalancerError::InvalidWeight { url: url.clone(), weight });
        }

        let mut servers = self.servers.lock().expect("server pool mutex poisoned");
        match servers.iter_mut().find(|s| &s.url == url) {
            Some(existing) => existing.weight = weight,
            None => servers.push(WeightedServer { url: url.clone(), weight }),
        }
        Ok(())
    }

    fn remove_server(&self, url: &Url) -> Result<(), LoadBalancerError> {
        self.servers
            .lock()
            .expect("server pool mutex poisoned")
            .retain(|s| &s.url != url);
        Ok(())
    }
}

/// Pools of every configured backend, keyed by backend name.
#[derive(Debug, Default)]
pub struct PoolDirectory {
    pools: DashMap<String, Arc<ServerPool>>,
}

impl PoolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pool of a backend.
    pub fn get(&self, name: &str) -> Option<Arc<ServerPool>> {
        self.pools.get(name).map(|entry| entry.value().clone())
    }

    /// Reconcile pools with a freshly loaded backend list.
    ///
    /// Every configured backend gets its pool reset to the configured servers;
    /// pools of backends no longer configured are dropped. Server addresses
    /// must already be validated.
    pub fn apply(&self, backends: &[BackendConfig]) {
        for backend in backends {
            let urls: Vec<Url> = backend
                .servers
                .iter()
                .filter_map(|s| match Url::parse(s) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(backend = %backend.name, server = %s, error = %e, "Invalid server URL");
                        None
                    }
                })
                .collect();

            self.pools
                .entry(backend.name.clone())
                .or_default()
                .reset(urls);
        }

        self.pools.retain(|name, _| {
            let keep = backends.iter().any(|b| &b.name == name);
            if !keep {
                tracing::info!(backend = %name, "Dropping pool of removed backend");
            }
            keep
        });
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn backend(name: &str, servers: &[&str]) -> BackendConfig {
        BackendConfig {
            name: name.into(),
            servers: servers.iter().map(|s| s.to_string()).collect(),
            health_check: None,
        }
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let pool = ServerPool::new();
        let s1 = url("http://127.0.0.1:8080");

        pool.upsert_server(&s1, 1).unwrap();
        pool.upsert_server(&s1, 1).unwrap();
        assert_eq!(pool.servers(), vec![s1.clone()]);

        pool.upsert_server(&s1, 5).unwrap();
        assert_eq!(pool.weighted_servers(), vec![WeightedServer { url: s1, weight: 5 }]);
    }

    #[test]
    fn test_remove_absent_server_is_ok() {
        let pool = ServerPool::with_servers([url("http://127.0.0.1:8080")]);
        pool.remove_server(&url("http://127.0.0.1:9999")).unwrap();
        assert_eq!(pool.len(), 1);

        pool.remove_server(&url("http://127.0.0.1:8080")).unwrap();
        pool.remove_server(&url("http://127.0.0.1:8080")).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn test_zero_weight_rejected() {
        let pool = ServerPool::new();
        let err = pool.upsert_server(&url("http://127.0.0.1:8080"), 0).unwrap_err();
        assert!(matches!(err, LoadBalancerError::InvalidWeight { weight: 0, .. }));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_directory_apply_resets_and_drops() {
        let directory = PoolDirectory::new();
        directory.apply(&[
            backend("api", &["http://10.0.0.1:80", "http://10.0.0.2:80"]),
            backend("web", &["http://10.0.0.3:80"]),
        ]);
        assert_eq!(directory.len(), 2);

        let api = directory.get("api").unwrap();
        api.remove_server(&url("http://10.0.0.1:80")).unwrap();
        assert_eq!(api.len(), 1);

        directory.apply(&[backend("api", &["http://10.0.0.1:80", "http://10.0.0.2:80"])]);
        assert_eq!(directory.len(), 1);
        assert!(directory.get("web").is_none());

        // Same Arc survives a reload and is reset to the configured list.
        assert!(Arc::ptr_eq(&api, &directory.get("api").unwrap()));
        assert_eq!(api.len(), 2);
    }
}
