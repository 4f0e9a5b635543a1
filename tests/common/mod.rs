//! Shared test doubles for breaker and health-server tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use circuit_guard::{BreakerConfig, CircuitBreaker};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyError {
    #[error("dependency unavailable")]
    Unavailable,
}

/// A fake remote dependency that counts invocations.
#[derive(Debug)]
pub struct FakeDependency {
    calls: AtomicU32,
    healthy: AtomicBool,
    latency: Duration,
}

#[allow(dead_code)]
impl FakeDependency {
    pub fn healthy() -> Arc<Self> {
        Self::with_latency(true, Duration::ZERO)
    }

    pub fn failing() -> Arc<Self> {
        Self::with_latency(false, Duration::ZERO)
    }

    pub fn with_latency(healthy: bool, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            healthy: AtomicBool::new(healthy),
            latency,
        })
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn fetch(&self, key: &str) -> Result<String, DependencyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(format!("remote:{key}"))
        } else {
            Err(DependencyError::Unavailable)
        }
    }
}

#[allow(dead_code)]
pub fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
    CircuitBreaker::new(
        "test-dependency",
        BreakerConfig::new(
            Duration::from_millis(3000),
            threshold,
            Duration::from_millis(reset_ms),
        ),
    )
}

/// Issue a bare HTTP/1.1 GET and return (status line, body).
#[allow(dead_code)]
pub async fn http_get(addr: SocketAddr, path: &str) -> (String, String) {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    socket.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    socket.read_to_string(&mut raw).await.unwrap();

    let status = raw.lines().next().unwrap_or_default().to_string();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}
