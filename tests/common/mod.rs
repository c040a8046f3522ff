//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use service_balancer::config::ServiceConfig;
use service_balancer::discovery::{ServiceInstance, StaticServerList};
use service_balancer::health::Ping;
use service_balancer::registry::Endpoint;
use service_balancer::{LbError, LoadBalancer, RequestContext};

/// Start a mock HTTP backend on an ephemeral port that answers `status`.
pub async fn start_mock_backend(status: u16) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Ping whose answer per host is set by the test.
#[derive(Debug, Default)]
pub struct ScriptedPing {
    failing: Mutex<HashSet<String>>,
}

impl ScriptedPing {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, host: &str) {
        self.failing.lock().unwrap().insert(host.to_string());
    }

    pub fn recover(&self, host: &str) {
        self.failing.lock().unwrap().remove(host);
    }
}

#[async_trait]
impl Ping for ScriptedPing {
    async fn ping(&self, endpoint: &Endpoint) -> service_balancer::Result<()> {
        if self.failing.lock().unwrap().contains(&endpoint.id().host) {
            Err(LbError::ProbeFailed {
                endpoint: endpoint.id().to_string(),
                reason: "scripted".into(),
            })
        } else {
            Ok(())
        }
    }
}

/// Config with fast probing and no periodic refresh in the way.
pub fn fast_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.refresh_interval_ms = 60_000;
    config.health_check.interval_ms = 20;
    config.health_check.timeout_ms = 20;
    config.health_check.unhealthy_threshold = 3;
    config.health_check.healthy_threshold = 2;
    config
}

pub fn static_list(hosts: &[&str]) -> Arc<StaticServerList> {
    Arc::new(StaticServerList::new(
        hosts.iter().map(|h| ServiceInstance::new(*h, 80)).collect(),
    ))
}

pub fn hosts(lb: &LoadBalancer, n: usize) -> Vec<String> {
    (0..n)
        .map(|_| lb.choose(&RequestContext::default()).unwrap().id().host.clone())
        .collect()
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
