//! Serializable balancer statistics.

use serde::Serialize;

use crate::balancer::lifecycle::BalancerState;
use crate::registry::{HealthStatus, RegistrySnapshot};

#[derive(Debug, Clone, Serialize)]
pub struct BalancerStats {
    pub service: String,
    pub mode: &'static str,
    pub state: BalancerState,
    pub generation: u64,
    pub endpoints: Vec<EndpointReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointReport {
    pub id: String,
    pub zone: Option<String>,
    pub weight: u32,
    pub status: HealthStatus,
    pub active_requests: usize,
    pub total_requests: u64,
    pub failures: u64,
    pub response_time_ms: Option<f64>,
    pub circuit_open: bool,
}

impl BalancerStats {
    pub fn collect(
        service: &str,
        mode: &'static str,
        state: BalancerState,
        snapshot: &RegistrySnapshot,
    ) -> Self {
        let endpoints = snapshot
            .endpoints()
            .iter()
            .map(|e| {
                let stats = e.stats();
                EndpointReport {
                    id: e.id().to_string(),
                    zone: e.zone().map(str::to_string),
                    weight: e.weight(),
                    status: e.status(),
                    active_requests: stats.active_requests(),
                    total_requests: stats.total_requests(),
                    failures: stats.failures(),
                    response_time_ms: stats.response_time_ms(),
                    circuit_open: stats.circuit().is_open(),
                }
            })
            .collect();

        Self {
            service: service.to_string(),
            mode,
            state,
            generation: snapshot.generation(),
            endpoints,
        }
    }

    pub fn available(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|e| e.status != HealthStatus::Down)
            .count()
    }
}
