//! Server list sources polled by the balancer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::discovery::{Discovery, ServiceInstance};
use crate::error::Result;

/// Source of the endpoint list for one service.
#[async_trait]
pub trait ServerList: Send + Sync + std::fmt::Debug {
    async fn fetch(&self) -> Result<Vec<ServiceInstance>>;
}

/// Default server list: whatever discovery reports for the service.
#[derive(Debug, Clone)]
pub struct DiscoveryServerList {
    service: String,
    discovery: Arc<dyn Discovery>,
}

impl DiscoveryServerList {
    pub fn new(service: impl Into<String>, discovery: Arc<dyn Discovery>) -> Self {
        Self {
            service: service.into(),
            discovery,
        }
    }
}

#[async_trait]
impl ServerList for DiscoveryServerList {
    async fn fetch(&self) -> Result<Vec<ServiceInstance>> {
        self.discovery.list_instances(&self.service).await
    }
}

/// A fixed list, typically registered as a named override.
#[derive(Debug, Clone, Default)]
pub struct StaticServerList {
    instances: Vec<ServiceInstance>,
}

impl StaticServerList {
    pub fn new(instances: Vec<ServiceInstance>) -> Self {
        Self { instances }
    }
}

#[async_trait]
impl ServerList for StaticServerList {
    async fn fetch(&self) -> Result<Vec<ServiceInstance>> {
        Ok(self.instances.clone())
    }
}
