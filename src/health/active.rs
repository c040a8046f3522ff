//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every endpoint of one service
//! - Bound every probe by a timeout (timeout = failed probe)
//! - Update endpoint health state through the hysteresis policy

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::error::LbError;
use crate::health::ping::Ping;
use crate::health::state::{log_transition, HealthPolicy, ProbeOutcome, ProbeResult};
use crate::observability::metrics;
use crate::registry::{Endpoint, ServerRegistry};

#[derive(Debug)]
pub struct HealthProber {
    service: String,
    registry: Arc<ServerRegistry>,
    ping: Arc<dyn Ping>,
    policy: HealthPolicy,
    enabled: bool,
    interval: Duration,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(
        service: impl Into<String>,
        registry: Arc<ServerRegistry>,
        ping: Arc<dyn Ping>,
        config: &HealthCheckConfig,
    ) -> Self {
        Self {
            service: service.into(),
            registry,
            ping,
            policy: HealthPolicy::from(config),
            enabled: config.enabled,
            interval: config.interval(),
            // A probe never outlives its round.
            timeout: config.timeout().min(config.interval()),
        }
    }

    /// Probe one endpoint under the configured deadline.
    pub async fn probe(&self, endpoint: &Endpoint) -> ProbeResult {
        let outcome = match time::timeout(self.timeout, self.ping.ping(endpoint)).await {
            Ok(Ok(())) => ProbeOutcome::Success,
            Ok(Err(e)) => {
                tracing::debug!(service = %self.service, error = %e, "Probe failed");
                ProbeOutcome::Failure
            }
            Err(_) => {
                let e = LbError::ProbeTimeout {
                    endpoint: endpoint.id().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                tracing::debug!(service = %self.service, error = %e, "Probe timed out");
                ProbeOutcome::Timeout
            }
        };

        ProbeResult {
            endpoint: endpoint.id().clone(),
            outcome,
            at: Instant::now(),
        }
    }

    /// Probe the current snapshot concurrently and apply the results.
    pub async fn probe_all(&self) {
        let snapshot = self.registry.current();
        let endpoints = snapshot.endpoints();

        let results = join_all(endpoints.iter().map(|e| self.probe(e))).await;

        for (endpoint, result) in endpoints.iter().zip(results) {
            if let Some(transition) = self.policy.apply(endpoint, &result) {
                log_transition(&self.service, endpoint.id(), transition, "probe");
            }
            metrics::record_endpoint_health(
                &self.service,
                &endpoint.id().to_string(),
                endpoint.is_available(),
            );
        }
    }

    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.enabled {
            tracing::info!(service = %self.service, "Active health checks disabled");
            return;
        }

        tracing::info!(
            service = %self.service,
            interval_ms = self.interval.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            "Health prober starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(service = %self.service, "Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::discovery::ServiceInstance;
    use crate::health::ping::NoopPing;
    use crate::registry::HealthStatus;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct SlowPing;

    #[async_trait]
    impl Ping for SlowPing {
        async fn ping(&self, _endpoint: &Endpoint) -> crate::error::Result<()> {
            time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    fn setup(ping: Arc<dyn Ping>, timeout_ms: u64) -> (Arc<ServerRegistry>, HealthProber) {
        let mut config = ServiceConfig::default();
        config.health_check.timeout_ms = timeout_ms;
        config.health_check.healthy_threshold = 1;
        config.health_check.unhealthy_threshold = 2;
        let registry = Arc::new(ServerRegistry::new("users", &config));
        registry.refresh(vec![ServiceInstance::new("a", 1), ServiceInstance::new("b", 2)]);
        let prober = HealthProber::new("users", registry.clone(), ping, &config.health_check);
        (registry, prober)
    }

    #[tokio::test]
    async fn test_probe_all_marks_up() {
        let (registry, prober) = setup(Arc::new(NoopPing), 1000);
        prober.probe_all().await;
        assert!(registry
            .current()
            .endpoints()
            .iter()
            .all(|e| e.status() == HealthStatus::Up));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let (registry, prober) = setup(Arc::new(SlowPing), 20);
        let snapshot = registry.current();

        let result = prober.probe(&snapshot.endpoints()[0]).await;
        assert_eq!(result.outcome, ProbeOutcome::Timeout);

        prober.probe_all().await;
        prober.probe_all().await;
        assert!(snapshot.endpoints().iter().all(|e| e.status() == HealthStatus::Down));
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let (_registry, prober) = setup(Arc::new(NoopPing), 1000);
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(Arc::new(prober).run(rx));
        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("prober did not stop")
            .unwrap();
    }
}
