//! Server registry subsystem.
//!
//! # Data Flow
//! ```text
//! Server list fetched (refresh task)
//!     → ServerRegistry::refresh(instances)
//!         - empty list rejected unless allowed
//!         - duplicate identities collapsed (first wins)
//!         - surviving endpoints keep their Arc (health + stats carry over)
//!     → ArcSwap store of a new RegistrySnapshot
//!
//! choose() path
//!     → ServerRegistry::current() (lock-free load)
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; in-flight readers keep the old one alive
//! - Writers serialize on a mutex, readers never touch it

pub mod endpoint;
pub mod stats;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::config::ServiceConfig;
use crate::discovery::ServiceInstance;

pub use endpoint::{ActiveRequest, Endpoint, EndpointId, HealthStatus, Transition};
pub use stats::EndpointStats;

/// Immutable view of the registry at one point in time.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    endpoints: Vec<Arc<Endpoint>>,
    index: HashMap<EndpointId, usize>,
    generation: u64,
}

impl RegistrySnapshot {
    /// Endpoints in discovery order.
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    pub fn get(&self, id: &EndpointId) -> Option<&Arc<Endpoint>> {
        self.index.get(id).map(|&i| &self.endpoints[i])
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Number of successful refreshes that produced this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Replaced {
        added: usize,
        removed: usize,
        kept: usize,
    },
    /// Empty update ignored; previous snapshot kept.
    RejectedEmpty,
}

/// Current endpoint set of one service.
#[derive(Debug)]
pub struct ServerRegistry {
    service: String,
    allow_empty: bool,
    ewma_alpha: f64,
    availability: crate::config::AvailabilityConfig,
    current: ArcSwap<RegistrySnapshot>,
    write_lock: Mutex<()>,
}

impl ServerRegistry {
    pub fn new(service: impl Into<String>, config: &ServiceConfig) -> Self {
        Self {
            service: service.into(),
            allow_empty: config.allow_empty_refresh,
            ewma_alpha: config.ewma_alpha,
            availability: config.availability.clone(),
            current: ArcSwap::from_pointee(RegistrySnapshot::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Consistent snapshot; never blocks.
    pub fn current(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    pub fn find(&self, id: &EndpointId) -> Option<Arc<Endpoint>> {
        self.current.load().get(id).cloned()
    }

    /// Atomically replace the endpoint set.
    pub fn refresh(&self, instances: Vec<ServiceInstance>) -> RefreshOutcome {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous = self.current.load_full();

        if instances.is_empty() && !self.allow_empty {
            tracing::warn!(
                service = %self.service,
                kept = previous.len(),
                "Discovery returned no instances, keeping previous server list"
            );
            return RefreshOutcome::RejectedEmpty;
        }

        let mut endpoints = Vec::with_capacity(instances.len());
        let mut index = HashMap::with_capacity(instances.len());
        let mut kept = 0;

        for instance in &instances {
            let id = EndpointId::new(instance.host.clone(), instance.port);
            if index.contains_key(&id) {
                tracing::warn!(service = %self.service, endpoint = %id, "Duplicate instance ignored");
                continue;
            }

            let endpoint = match previous.get(&id) {
                Some(existing) if existing.matches(instance) => {
                    kept += 1;
                    existing.clone()
                }
                _ => Arc::new(Endpoint::new(
                    instance,
                    EndpointStats::new(self.ewma_alpha, &self.availability),
                )),
            };

            index.insert(id, endpoints.len());
            endpoints.push(endpoint);
        }

        let new_ids: HashSet<&EndpointId> = index.keys().collect();
        let removed = previous
            .endpoints()
            .iter()
            .filter(|e| !new_ids.contains(e.id()))
            .count();
        let added = endpoints.len() - kept;

        let snapshot = RegistrySnapshot {
            endpoints,
            index,
            generation: previous.generation + 1,
        };
        self.current.store(Arc::new(snapshot));

        if added > 0 || removed > 0 {
            tracing::info!(service = %self.service, added, removed, kept, "Server list updated");
        } else {
            tracing::debug!(service = %self.service, kept, "Server list unchanged");
        }

        RefreshOutcome::Replaced {
            added,
            removed,
            kept,
        }
    }
}
