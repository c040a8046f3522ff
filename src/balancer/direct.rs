//! Direct balancer used when the managed balancer is switched off.
//!
//! Fetches the server list on every call and round-robins over it. No
//! probing, no filtering, no background tasks. Endpoints are still kept in a
//! registry so reported outcomes accumulate across calls.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::discovery::ServerList;
use crate::error::Result;
use crate::health::Outcome;
use crate::registry::{Endpoint, ServerRegistry};
use crate::rule::{RequestContext, RoundRobin, SelectionContext, SelectionRule};

use super::{BalancerState, BalancerStats};

#[derive(Debug)]
pub struct DirectBalancer {
    service: String,
    server_list: Arc<dyn ServerList>,
    registry: ServerRegistry,
    rotation: RoundRobin,
}

impl DirectBalancer {
    pub fn new(service: impl Into<String>, config: &ServiceConfig, server_list: Arc<dyn ServerList>) -> Self {
        let service = service.into();
        // Mirror the raw list, including an empty one.
        let mut config = config.clone();
        config.allow_empty_refresh = true;

        Self {
            registry: ServerRegistry::new(service.clone(), &config),
            service,
            server_list,
            rotation: RoundRobin::new(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub async fn choose(&self, request: &RequestContext) -> Result<Arc<Endpoint>> {
        let instances = self.server_list.fetch().await?;
        self.registry.refresh(instances);

        let snapshot = self.registry.current();
        let ctx = SelectionContext {
            service: &self.service,
            candidates: snapshot.endpoints(),
            request,
        };
        self.rotation.choose(&ctx)
    }

    pub fn report_outcome(&self, endpoint: &Endpoint, outcome: Outcome, latency: Duration) {
        // Stats only; there is no prober to bring a forced-down endpoint back.
        endpoint.stats().record(outcome.is_success(), latency);
    }

    pub fn stats(&self) -> BalancerStats {
        BalancerStats::collect(&self.service, "direct", BalancerState::Running, &self.registry.current())
    }
}
