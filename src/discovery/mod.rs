//! Discovery collaborator and server lists.
//!
//! # Data Flow
//! ```text
//! Discovery::list_instances(service)     (external backend, or StaticDiscovery)
//!     → DiscoveryServerList::fetch()     (default server list of a service)
//!     → ServerRegistry::refresh()        (registry swap)
//! ```
//!
//! # Design Decisions
//! - A server list is the unit the balancer polls; discovery is only one source
//! - Initial and updated lists are the same call

pub mod server_list;
pub mod static_discovery;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::InstanceConfig;
use crate::error::Result;

pub use server_list::{DiscoveryServerList, ServerList, StaticServerList};
pub use static_discovery::StaticDiscovery;

/// One instance as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ServiceInstance {
    pub host: String,
    pub port: u16,
    pub zone: Option<String>,
    pub weight: u32,
}

impl ServiceInstance {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            zone: None,
            weight: 1,
        }
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

impl From<&InstanceConfig> for ServiceInstance {
    fn from(config: &InstanceConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            zone: config.zone.clone(),
            weight: config.weight,
        }
    }
}

/// Service discovery as consumed by the balancer.
#[async_trait]
pub trait Discovery: Send + Sync + std::fmt::Debug {
    async fn list_instances(&self, service: &str) -> Result<Vec<ServiceInstance>>;
}
