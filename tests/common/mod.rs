//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use backend_health::load_balancer::pool::ServerPool;
use backend_health::{LoadBalancer, LoadBalancerError};

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` decides the status of each response; it may sleep to simulate a hang.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = u16> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let status = f().await;
                let reason = StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let body = "ok";
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

/// A backend that can be switched between healthy (200) and hanging.
pub struct SwitchableBackend {
    pub url: Url,
    healthy: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
}

impl SwitchableBackend {
    pub async fn start(healthy: bool, hang: Duration) -> Self {
        let flag = Arc::new(AtomicBool::new(healthy));
        let hits = Arc::new(AtomicUsize::new(0));
        let (f, h) = (flag.clone(), hits.clone());

        let addr = start_programmable_backend(move || {
            let (f, h) = (f.clone(), h.clone());
            async move {
                h.fetch_add(1, Ordering::SeqCst);
                if !f.load(Ordering::SeqCst) {
                    tokio::time::sleep(hang).await;
                }
                200
            }
        })
        .await;

        Self {
            url: Url::parse(&format!("http://{}", addr)).unwrap(),
            healthy: flag,
            hits,
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a backend that always answers with `status`.
pub async fn start_status_backend(status: u16) -> Url {
    let addr = start_programmable_backend(move || async move { status }).await;
    Url::parse(&format!("http://{}", addr)).unwrap()
}

/// Server pool instrumented for assertions.
#[derive(Debug, Default)]
pub struct InstrumentedPool {
    pub inner: ServerPool,
    pub servers_calls: AtomicUsize,
    pub mutations: AtomicUsize,
    pub fail_upserts: AtomicBool,
    pub fail_removes: AtomicBool,
}

impl InstrumentedPool {
    pub fn with_servers(urls: impl IntoIterator<Item = Url>) -> Self {
        Self {
            inner: ServerPool::with_servers(urls),
            ..Default::default()
        }
    }

    pub fn servers_calls(&self) -> usize {
        self.servers_calls.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

impl LoadBalancer for InstrumentedPool {
    fn servers(&self) -> Vec<Url> {
        self.servers_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.servers()
    }

    fn upsert_server(&self, url: &Url, weight: u32) -> Result<(), LoadBalancerError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(LoadBalancerError::Unavailable("upserts disabled".into()));
        }
        self.inner.upsert_server(url, weight)
    }

    fn remove_server(&self, url: &Url) -> Result<(), LoadBalancerError> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(LoadBalancerError::Unavailable("removals disabled".into()));
        }
        self.inner.remove_server(url)
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
