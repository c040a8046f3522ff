//! Per-service balancer construction.
//!
//! # Resolution
//! ```text
//! create(service)
//!     config       = named config       | default config
//!     rule         = named rule         | build_rule(config)
//!     ping         = named ping         | build_ping(config.health_check)
//!     filter       = named filter       | FilterChain::from_config(config.filter)
//!     server list  = named server list  | DiscoveryServerList(discovery, service)
//!
//!     config.initialize_balancer
//!         true  → ServiceBalancer::Managed(LoadBalancer)
//!         false → ServiceBalancer::Direct(DirectBalancer)
//! ```
//!
//! # Design Decisions
//! - Named overrides live in a concurrent map per slot, keyed by service
//! - The managed/direct decision is made once here, never per call

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::config::{BalancerConfig, ServiceConfig};
use crate::discovery::{Discovery, DiscoveryServerList, ServerList};
use crate::error::Result;
use crate::filter::ServerListFilter;
use crate::health::{Outcome, Ping};
use crate::registry::Endpoint;
use crate::rule::{RequestContext, SelectionRule};

use super::{check_config, BalancerStats, DirectBalancer, LoadBalancer};

/// Named strategy overrides, one map per slot.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    configs: DashMap<String, ServiceConfig>,
    rules: DashMap<String, Arc<dyn SelectionRule>>,
    pings: DashMap<String, Arc<dyn Ping>>,
    filters: DashMap<String, Arc<dyn ServerListFilter>>,
    server_lists: DashMap<String, Arc<dyn ServerList>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_config(&self, service: &str, config: ServiceConfig) {
        self.configs.insert(service.to_string(), config);
    }

    pub fn register_rule(&self, service: &str, rule: Arc<dyn SelectionRule>) {
        self.rules.insert(service.to_string(), rule);
    }

    pub fn register_ping(&self, service: &str, ping: Arc<dyn Ping>) {
        self.pings.insert(service.to_string(), ping);
    }

    pub fn register_filter(&self, service: &str, filter: Arc<dyn ServerListFilter>) {
        self.filters.insert(service.to_string(), filter);
    }

    pub fn register_server_list(&self, service: &str, server_list: Arc<dyn ServerList>) {
        self.server_lists.insert(service.to_string(), server_list);
    }

    pub fn config(&self, service: &str) -> Option<ServiceConfig> {
        self.configs.get(service).map(|c| c.value().clone())
    }

    pub fn rule(&self, service: &str) -> Option<Arc<dyn SelectionRule>> {
        self.rules.get(service).map(|r| r.value().clone())
    }

    pub fn ping(&self, service: &str) -> Option<Arc<dyn Ping>> {
        self.pings.get(service).map(|p| p.value().clone())
    }

    pub fn filter(&self, service: &str) -> Option<Arc<dyn ServerListFilter>> {
        self.filters.get(service).map(|f| f.value().clone())
    }

    pub fn server_list(&self, service: &str) -> Option<Arc<dyn ServerList>> {
        self.server_lists.get(service).map(|s| s.value().clone())
    }
}

/// Balancer for one service, chosen once at creation.
#[derive(Debug)]
pub enum ServiceBalancer {
    Managed(LoadBalancer),
    Direct(DirectBalancer),
}

impl ServiceBalancer {
    pub fn service(&self) -> &str {
        match self {
            ServiceBalancer::Managed(lb) => lb.service(),
            ServiceBalancer::Direct(lb) => lb.service(),
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, ServiceBalancer::Managed(_))
    }

    pub fn as_managed(&self) -> Option<&LoadBalancer> {
        match self {
            ServiceBalancer::Managed(lb) => Some(lb),
            ServiceBalancer::Direct(_) => None,
        }
    }

    /// No-op for the direct variant.
    pub async fn start(&self) -> Result<()> {
        match self {
            ServiceBalancer::Managed(lb) => lb.start().await,
            ServiceBalancer::Direct(_) => Ok(()),
        }
    }

    /// No-op for the direct variant.
    pub async fn stop(&self) -> Result<()> {
        match self {
            ServiceBalancer::Managed(lb) => lb.stop().await,
            ServiceBalancer::Direct(_) => Ok(()),
        }
    }

    pub async fn choose(&self, request: &RequestContext) -> Result<Arc<Endpoint>> {
        match self {
            ServiceBalancer::Managed(lb) => lb.choose(request),
            ServiceBalancer::Direct(lb) => lb.choose(request).await,
        }
    }

    pub fn report_outcome(&self, endpoint: &Endpoint, outcome: Outcome, latency: Duration) {
        match self {
            ServiceBalancer::Managed(lb) => lb.report_outcome(endpoint, outcome, latency),
            ServiceBalancer::Direct(lb) => lb.report_outcome(endpoint, outcome, latency),
        }
    }

    pub fn stats(&self) -> BalancerStats {
        match self {
            ServiceBalancer::Managed(lb) => lb.stats(),
            ServiceBalancer::Direct(lb) => lb.stats(),
        }
    }
}

/// Creates balancers per service from named overrides and defaults.
#[derive(Debug)]
pub struct BalancerFactory {
    default_config: ServiceConfig,
    discovery: Arc<dyn Discovery>,
    strategies: StrategyRegistry,
}

impl BalancerFactory {
    pub fn new(default_config: ServiceConfig, discovery: Arc<dyn Discovery>) -> Self {
        Self {
            default_config,
            discovery,
            strategies: StrategyRegistry::new(),
        }
    }

    /// Factory with every `[services.*]` entry registered as a named config.
    pub fn from_config(config: &BalancerConfig, discovery: Arc<dyn Discovery>) -> Self {
        let factory = Self::new(config.default_service.clone(), discovery);
        for (name, service) in &config.services {
            factory.strategies.register_config(name, service.clone());
        }
        factory
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Named config for `service`, else the default one.
    pub fn resolve_config(&self, service: &str) -> ServiceConfig {
        self.strategies
            .config(service)
            .unwrap_or_else(|| self.default_config.clone())
    }

    /// Create a balancer for `service` using its resolved config.
    pub fn create(&self, service: &str) -> Result<ServiceBalancer> {
        self.create_with_config(service, self.resolve_config(service))
    }

    /// Create a balancer for `service` with an explicit config.
    pub fn create_with_config(&self, service: &str, config: ServiceConfig) -> Result<ServiceBalancer> {
        check_config(service, &config)?;

        let server_list = self.strategies.server_list(service).unwrap_or_else(|| {
            Arc::new(DiscoveryServerList::new(service, self.discovery.clone()))
        });

        if !config.initialize_balancer {
            tracing::info!(service, "Managed balancer disabled, using direct round robin");
            return Ok(ServiceBalancer::Direct(DirectBalancer::new(
                service,
                &config,
                server_list,
            )));
        }

        let mut builder = LoadBalancer::builder(service, config);
        if let Some(rule) = self.strategies.rule(service) {
            builder = builder.rule(rule);
        }
        if let Some(ping) = self.strategies.ping(service) {
            builder = builder.ping(ping);
        }
        if let Some(filter) = self.strategies.filter(service) {
            builder = builder.filter(filter);
        }

        let lb = builder.build(server_list)?;
        tracing::debug!(service, rule = lb.rule_name(), "Managed balancer created");
        Ok(ServiceBalancer::Managed(lb))
    }
}
