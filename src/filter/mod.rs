//! Server list filters.
//!
//! # Data Flow
//! ```text
//! Registry snapshot
//!     → FilterChain (in order):
//!         - HealthyOnly  (drop Down)
//!         - ZoneAffinity (keep preferred zone, optional fallback)
//!     → eligible subset handed to the selection rule
//! ```
//!
//! # Design Decisions
//! - Filters are pure functions of the snapshot and static criteria
//! - Total: an empty input yields an empty output, never an error
//! - Order of the input is preserved

use std::sync::Arc;

use crate::config::FilterConfig;
use crate::registry::Endpoint;

/// Narrows a server list to an eligible subset.
pub trait ServerListFilter: Send + Sync + std::fmt::Debug {
    fn apply(&self, endpoints: &[Arc<Endpoint>]) -> Vec<Arc<Endpoint>>;
}

/// Passes everything through.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllEndpoints;

impl ServerListFilter for AllEndpoints {
    fn apply(&self, endpoints: &[Arc<Endpoint>]) -> Vec<Arc<Endpoint>> {
        endpoints.to_vec()
    }
}

/// Drops endpoints marked down.
#[derive(Debug, Default, Clone, Copy)]
pub struct HealthyOnly;

impl ServerListFilter for HealthyOnly {
    fn apply(&self, endpoints: &[Arc<Endpoint>]) -> Vec<Arc<Endpoint>> {
        endpoints
            .iter()
            .filter(|e| e.is_available())
            .cloned()
            .collect()
    }
}

/// Keeps endpoints in one zone.
#[derive(Debug, Clone)]
pub struct ZoneAffinity {
    zone: String,
    fallback: bool,
}

impl ZoneAffinity {
    /// With `fallback`, the whole input is returned when no available
    /// endpoint lives in `zone`.
    pub fn new(zone: impl Into<String>, fallback: bool) -> Self {
        Self {
            zone: zone.into(),
            fallback,
        }
    }
}

impl ServerListFilter for ZoneAffinity {
    fn apply(&self, endpoints: &[Arc<Endpoint>]) -> Vec<Arc<Endpoint>> {
        let local: Vec<Arc<Endpoint>> = endpoints
            .iter()
            .filter(|e| e.zone() == Some(self.zone.as_str()))
            .cloned()
            .collect();

        if self.fallback && !local.iter().any(|e| e.is_available()) {
            tracing::trace!(zone = %self.zone, "No available zone-local endpoint, using all zones");
            return endpoints.to_vec();
        }
        local
    }
}

/// Applies filters in sequence.
#[derive(Debug, Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn ServerListFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl ServerListFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Default filter for a service config.
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut chain = Self::new();
        if config.healthy_only {
            chain = chain.with(HealthyOnly);
        }
        if let Some(zone) = &config.zone {
            chain = chain.with(ZoneAffinity::new(zone.clone(), config.zone_fallback));
        }
        chain
    }
}

impl ServerListFilter for FilterChain {
    fn apply(&self, endpoints: &[Arc<Endpoint>]) -> Vec<Arc<Endpoint>> {
        let mut current = endpoints.to_vec();
        for filter in &self.filters {
            if current.is_empty() {
                break;
            }
            current = filter.apply(&current);
        }
        current
    }
}
