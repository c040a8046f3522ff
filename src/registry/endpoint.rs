//! Endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single backend instance of a service
//! - Track health state (Up/Down/Unknown) with hysteresis counters
//! - Carry runtime stats used by the selection rules

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::discovery::ServiceInstance;
use crate::registry::stats::EndpointStats;

/// Identity of an endpoint. Unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EndpointId {
    pub host: String,
    pub port: u16,
}

impl EndpointId {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Health status of an endpoint.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Unknown = 0,
    Up = 1,
    Down = 2,
}

impl From<u8> for HealthStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthStatus::Up,
            2 => HealthStatus::Down,
            _ => HealthStatus::Unknown,
        }
    }
}

/// A status change, returned so callers can log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthStatus,
    pub to: HealthStatus,
}

/// A single endpoint of a service.
#[derive(Debug)]
pub struct Endpoint {
    id: EndpointId,
    zone: Option<String>,
    weight: u32,

    status: AtomicU8,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,

    stats: EndpointStats,
}

impl Endpoint {
    pub fn new(instance: &ServiceInstance, stats: EndpointStats) -> Self {
        Self {
            id: EndpointId::new(instance.host.clone(), instance.port),
            zone: instance.zone.clone(),
            weight: instance.weight.max(1),
            status: AtomicU8::new(HealthStatus::Unknown as u8),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            stats,
        }
    }

    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn stats(&self) -> &EndpointStats {
        &self.stats
    }

    /// True when `instance` describes this endpoint with the same metadata.
    pub fn matches(&self, instance: &ServiceInstance) -> bool {
        self.id.host == instance.host
            && self.id.port == instance.port
            && self.zone == instance.zone
            && self.weight == instance.weight.max(1)
    }

    // --- Health Logic ---

    pub fn status(&self) -> HealthStatus {
        HealthStatus::from(self.status.load(Ordering::Acquire))
    }

    /// Unknown endpoints are eligible; only Down is excluded.
    pub fn is_available(&self) -> bool {
        self.status() != HealthStatus::Down
    }

    /// Record a successful probe.
    pub fn mark_success(&self, healthy_threshold: u32) -> Option<Transition> {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.status() == HealthStatus::Up {
            return None;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= healthy_threshold {
            return self.transition_to(HealthStatus::Up);
        }
        None
    }

    /// Record a failed probe.
    pub fn mark_failure(&self, unhealthy_threshold: u32) -> Option<Transition> {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.status() == HealthStatus::Down {
            return None;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= unhealthy_threshold {
            return self.transition_to(HealthStatus::Down);
        }
        None
    }

    /// Mark down immediately, bypassing the failure threshold.
    pub fn force_down(&self) -> Option<Transition> {
        self.transition_to(HealthStatus::Down)
    }

    fn transition_to(&self, to: HealthStatus) -> Option<Transition> {
        let prev = self.status.swap(to as u8, Ordering::AcqRel);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.consecutive_successes.store(0, Ordering::Relaxed);

        let from = HealthStatus::from(prev);
        (from != to).then_some(Transition { from, to })
    }

    /// Start tracking an in-flight request. The count drops with the guard.
    pub fn begin_request(self: &Arc<Self>) -> ActiveRequest {
        self.stats.inc_active();
        ActiveRequest {
            endpoint: self.clone(),
        }
    }
}

/// A RAII guard that manages the active request count.
#[derive(Debug)]
pub struct ActiveRequest {
    endpoint: Arc<Endpoint>,
}

impl ActiveRequest {
    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }
}

impl Deref for ActiveRequest {
    type Target = Endpoint;
    fn deref(&self) -> &Self::Target {
        &self.endpoint
    }
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        self.endpoint.stats.dec_active();
    }
}
