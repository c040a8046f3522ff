//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Client config used for any service without a named entry.
    pub default_service: ServiceConfig,

    /// Named per-service client configs.
    pub services: HashMap<String, ServiceConfig>,

    /// Static instance lists keyed by service name.
    pub discovery: HashMap<String, Vec<InstanceConfig>>,
}

impl BalancerConfig {
    /// Named config for `service`, else the default one.
    pub fn service(&self, service: &str) -> &ServiceConfig {
        self.services.get(service).unwrap_or(&self.default_service)
    }

    /// Every service name mentioned in the file, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .keys()
            .chain(self.discovery.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Per-service client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Build the managed balancer. When false the service gets a plain
    /// round-robin over the raw server list, without probing or filtering.
    pub initialize_balancer: bool,

    /// Server list refresh interval in milliseconds.
    pub refresh_interval_ms: u64,

    /// Deadline for a single server list fetch in milliseconds.
    pub refresh_timeout_ms: u64,

    /// Accept an empty server list as a valid refresh.
    pub allow_empty_refresh: bool,

    /// Selection rule.
    pub rule: RuleKind,

    /// Decay factor for the response-time EWMA, in (0, 1).
    pub ewma_alpha: f64,

    /// Health probing.
    pub health_check: HealthCheckConfig,

    /// Server list filtering.
    pub filter: FilterConfig,

    /// Availability rule and circuit breaker limits.
    pub availability: AvailabilityConfig,

    /// Retry policy for `execute_with_retry`.
    pub retry: RetryConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            initialize_balancer: true,
            refresh_interval_ms: 30_000,
            refresh_timeout_ms: 5_000,
            allow_empty_refresh: false,
            rule: RuleKind::RoundRobin,
            ewma_alpha: 0.8,
            health_check: HealthCheckConfig::default(),
            filter: FilterConfig::default(),
            availability: AvailabilityConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

/// Selection rule names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    RoundRobin,
    Random,
    WeightedResponseTime,
    AvailabilityFiltering,
    LeastConnections,
}

/// Ping strategy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PingKind {
    /// Always reports up.
    Noop,
    /// TCP connect.
    Tcp,
    /// HTTP GET on `path`, 2xx is up.
    Http,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Ping strategy.
    pub ping: PingKind,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds. Must not exceed the interval.
    pub timeout_ms: u64,

    /// Number of consecutive failures before marking down.
    pub unhealthy_threshold: u32,

    /// Number of consecutive successes before marking up.
    pub healthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ping: PingKind::Tcp,
            path: "/health".to_string(),
            interval_ms: 10_000,
            timeout_ms: 2_000,
            unhealthy_threshold: 3,
            healthy_threshold: 2,
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Server list filter criteria.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Preferred zone.
    pub zone: Option<String>,

    /// Use the whole list when the zone has no eligible endpoint.
    pub zone_fallback: bool,

    /// Drop endpoints marked down before zone filtering.
    pub healthy_only: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            zone: None,
            zone_fallback: true,
            healthy_only: true,
        }
    }
}

/// Limits used by the availability rule and the per-endpoint circuit breaker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Skip endpoints with at least this many in-flight requests.
    pub max_active_requests: usize,

    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Initial open duration in milliseconds.
    pub base_trip_ms: u64,

    /// Maximum open duration in milliseconds.
    pub max_trip_ms: u64,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            max_active_requests: 1_000,
            failure_threshold: 3,
            base_trip_ms: 10_000,
            max_trip_ms: 30_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// A statically configured instance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InstanceConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Interval between stats log lines in seconds, 0 disables them.
    pub stats_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            stats_interval_secs: 30,
        }
    }
}
