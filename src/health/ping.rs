//! Ping strategies.
//!
//! # Responsibilities
//! - Answer "is this endpoint alive?" for one endpoint
//! - Stay deadline-free: the prober wraps every ping in its timeout

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::{HealthCheckConfig, PingKind};
use crate::error::{LbError, Result};
use crate::registry::Endpoint;

/// Liveness check for a single endpoint. `Ok(())` means up.
#[async_trait]
pub trait Ping: Send + Sync + std::fmt::Debug {
    async fn ping(&self, endpoint: &Endpoint) -> Result<()>;
}

/// Always up. Used when probing is disabled or no real check exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPing;

#[async_trait]
impl Ping for NoopPing {
    async fn ping(&self, _endpoint: &Endpoint) -> Result<()> {
        Ok(())
    }
}

/// Up if a TCP connection can be established.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpPing;

#[async_trait]
impl Ping for TcpPing {
    async fn ping(&self, endpoint: &Endpoint) -> Result<()> {
        let id = endpoint.id();
        TcpStream::connect((id.host.as_str(), id.port))
            .await
            .map(drop)
            .map_err(|e| LbError::ProbeFailed {
                endpoint: id.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Up if `GET http://host:port{path}` answers 2xx.
#[derive(Debug, Clone)]
pub struct HttpPing {
    client: reqwest::Client,
    path: String,
}

impl HttpPing {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("service-balancer-health-check")
            .no_proxy()
            .build()
            .map_err(|e| LbError::Config(format!("health check client: {}", e)))?;

        Ok(Self {
            client,
            path: path.into(),
        })
    }
}

#[async_trait]
impl Ping for HttpPing {
    async fn ping(&self, endpoint: &Endpoint) -> Result<()> {
        let url = format!("http://{}{}", endpoint.id(), self.path);
        let failed = |reason: String| LbError::ProbeFailed {
            endpoint: endpoint.id().to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(failed(format!("status {}", response.status())))
        }
    }
}

/// Default ping for a health check config.
pub fn build_ping(config: &HealthCheckConfig) -> Result<Arc<dyn Ping>> {
    let ping: Arc<dyn Ping> = match config.ping {
        PingKind::Noop => Arc::new(NoopPing),
        PingKind::Tcp => Arc::new(TcpPing),
        PingKind::Http => Arc::new(HttpPing::new(config.path.clone(), config.timeout())?),
    };
    Ok(ping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AvailabilityConfig;
    use crate::discovery::ServiceInstance;
    use crate::registry::EndpointStats;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn endpoint(port: u16) -> Endpoint {
        Endpoint::new(
            &ServiceInstance::new("127.0.0.1", port),
            EndpointStats::new(0.8, &AvailabilityConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_tcp_ping() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(TcpPing.ping(&endpoint(port)).await.is_ok());

        drop(listener);
        assert!(matches!(
            TcpPing.ping(&endpoint(port)).await,
            Err(LbError::ProbeFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_http_ping_checks_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut n = 0;
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let status = if n == 0 { "200 OK" } else { "503 Service Unavailable" };
                n += 1;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        let ping = HttpPing::new("/health", Duration::from_secs(2)).unwrap();
        assert!(ping.ping(&endpoint(port)).await.is_ok());
        assert!(ping.ping(&endpoint(port)).await.is_err());
    }

    #[tokio::test]
    async fn test_build_ping() {
        let mut config = HealthCheckConfig::default();
        config.ping = PingKind::Noop;
        let ping = build_ping(&config).unwrap();
        assert!(ping.ping(&endpoint(1)).await.is_ok());
    }
}
