//! Disabled server set of one backend.
//!
//! # States
//! - Enabled: in the load balancer's live list
//! - Disabled: in this set, excluded after a failed probe
//!
//! A server known to a backend is in exactly one of the two. The set is owned
//! by the backend's monitor task and needs no locking.

use url::Url;

#[derive(Debug, Default, Clone)]
pub struct DisabledServers {
    urls: Vec<Url>,
}

impl DisabledServers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `url` unless already present. Returns true if added.
    pub fn insert(&mut self, url: Url) -> bool {
        if self.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url)
    }

    /// Take every disabled server out for re-evaluation.
    pub fn take(&mut self) -> Vec<Url> {
        std::mem::take(&mut self.urls)
    }

    pub fn as_slice(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
