//! In-memory discovery backed by static instance lists.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::InstanceConfig;
use crate::discovery::{Discovery, ServiceInstance};
use crate::error::{LbError, Result};

/// Discovery over lists set in code or loaded from config.
///
/// Unknown services are an error, a known service with no instances is not.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    services: DashMap<String, Vec<ServiceInstance>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(discovery: &HashMap<String, Vec<InstanceConfig>>) -> Self {
        let this = Self::new();
        this.replace_all(discovery);
        this
    }

    /// Replace the instance list of one service.
    pub fn set_instances(&self, service: &str, instances: Vec<ServiceInstance>) {
        self.services.insert(service.to_string(), instances);
    }

    /// Forget a service entirely.
    pub fn remove(&self, service: &str) {
        self.services.remove(service);
    }

    /// Replace every list with the ones from a (re)loaded config.
    pub fn replace_all(&self, discovery: &HashMap<String, Vec<InstanceConfig>>) {
        self.services
            .retain(|name, _| discovery.contains_key(name.as_str()));
        for (name, instances) in discovery {
            self.set_instances(name, instances.iter().map(ServiceInstance::from).collect());
        }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn list_instances(&self, service: &str) -> Result<Vec<ServiceInstance>> {
        self.services
            .get(service)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LbError::Discovery(format!("unknown service '{}'", service)))
    }
}
