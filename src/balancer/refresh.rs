//! Periodic server list refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::discovery::ServerList;
use crate::error::{LbError, Result};
use crate::observability::metrics;
use crate::registry::{RefreshOutcome, ServerRegistry};

#[derive(Debug)]
pub struct Refresher {
    service: String,
    registry: Arc<ServerRegistry>,
    server_list: Arc<dyn ServerList>,
    timeout: Duration,
}

impl Refresher {
    pub fn new(
        service: impl Into<String>,
        registry: Arc<ServerRegistry>,
        server_list: Arc<dyn ServerList>,
        timeout: Duration,
    ) -> Self {
        Self {
            service: service.into(),
            registry,
            server_list,
            timeout,
        }
    }

    /// Fetch the server list once and swap it into the registry.
    pub async fn refresh_once(&self) -> Result<RefreshOutcome> {
        let fetched = match time::timeout(self.timeout, self.server_list.fetch()).await {
            Ok(Ok(instances)) => instances,
            Ok(Err(e)) => return Err(self.failed(e.to_string())),
            Err(_) => {
                return Err(self.failed(format!(
                    "timed out after {} ms",
                    self.timeout.as_millis()
                )))
            }
        };

        let outcome = self.registry.refresh(fetched);
        let label = match outcome {
            RefreshOutcome::Replaced { .. } => "ok",
            RefreshOutcome::RejectedEmpty => "empty",
        };
        metrics::record_refresh(&self.service, label);
        Ok(outcome)
    }

    fn failed(&self, reason: String) -> LbError {
        metrics::record_refresh(&self.service, "error");
        LbError::RefreshFailed {
            service: self.service.clone(),
            reason,
        }
    }

    /// Refresh every `interval` until shutdown. The first refresh happens
    /// one interval after the call; `start()` does the initial one itself.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(_) => {
                            if consecutive_failures > 0 {
                                tracing::info!(service = %self.service, after = consecutive_failures, "Server list refresh recovered");
                            }
                            consecutive_failures = 0;
                        }
                        Err(e) => {
                            consecutive_failures += 1;
                            tracing::warn!(
                                service = %self.service,
                                error = %e,
                                consecutive_failures,
                                "Keeping stale server list"
                            );
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(service = %self.service, "Refresher received shutdown signal, exiting loop");
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
    use crate::discovery::{ServiceInstance, StaticDiscovery, DiscoveryServerList};

    #[tokio::test]
    async fn test_discovery_error_keeps_registry() {
        let discovery = Arc::new(StaticDiscovery::new());
        discovery.set_instances("users", vec![ServiceInstance::new("a", 1)]);

        let registry = Arc::new(ServerRegistry::new("users", &ServiceConfig::default()));
        let refresher = Refresher::new(
            "users",
            registry.clone(),
            Arc::new(DiscoveryServerList::new("users", discovery.clone())),
            Duration::from_secs(1),
        );

        refresher.refresh_once().await.unwrap();
        assert_eq!(registry.current().len(), 1);

        discovery.remove("users");
        let err = refresher.refresh_once().await.unwrap_err();
        assert!(matches!(err, LbError::RefreshFailed { .. }));
        assert_eq!(registry.current().len(), 1);

        discovery.set_instances("users", vec![]);
        assert_eq!(
            refresher.refresh_once().await.unwrap(),
            RefreshOutcome::RejectedEmpty
        );
        assert_eq!(registry.current().len(), 1);
    }
}
