//! Per-endpoint circuit breaker.
//!
//! # States
//! - Closed: endpoint eligible for the availability rule
//! - Open: endpoint skipped until the trip deadline passes
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//!                open for base_trip * 2^(failures - threshold), capped at max_trip
//! Open → Closed: deadline passed (implicit) or any success reported
//! ```
//!
//! # Design Decisions
//! - Fed by request outcomes only, never by health probes
//! - Lock-free: deadline stored as milliseconds since the breaker was created

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::AvailabilityConfig;

#[derive(Debug)]
pub struct CircuitBreaker {
    created: Instant,
    failure_threshold: u32,
    base_trip_ms: u64,
    max_trip_ms: u64,
    consecutive_failures: AtomicU32,
    /// 0 = closed.
    open_until_ms: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(config: &AvailabilityConfig) -> Self {
        Self {
            created: Instant::now(),
            failure_threshold: config.failure_threshold.max(1),
            base_trip_ms: config.base_trip_ms,
            max_trip_ms: config.max_trip_ms,
            consecutive_failures: AtomicU32::new(0),
            open_until_ms: AtomicU64::new(0),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        // +1 keeps a deadline computed right after creation distinct from "closed".
        self.created.elapsed().as_millis() as u64 + 1
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.open_until_ms.store(0, Ordering::Release);
    }

    /// Record a failure. Returns the open duration if this failure tripped the breaker.
    pub fn record_failure(&self) -> Option<Duration> {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures < self.failure_threshold {
            return None;
        }

        let exponent = (failures - self.failure_threshold).min(16);
        let trip_ms = self
            .base_trip_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_trip_ms);
        self.open_until_ms
            .store(self.elapsed_ms() + trip_ms, Ordering::Release);
        Some(Duration::from_millis(trip_ms))
    }

    pub fn is_open(&self) -> bool {
        let until = self.open_until_ms.load(Ordering::Acquire);
        until != 0 && self.elapsed_ms() < until
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }
}
