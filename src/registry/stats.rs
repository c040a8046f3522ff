//! Per-endpoint runtime statistics.
//!
//! Response time is tracked as an exponentially weighted moving average
//! stored in the bits of an `AtomicU64`, updated with a CAS loop.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::AvailabilityConfig;
use crate::resilience::circuit_breaker::CircuitBreaker;

/// Sentinel for "no sample yet".
const NO_SAMPLE: f64 = -1.0;

#[derive(Debug)]
pub struct EndpointStats {
    active_requests: AtomicUsize,
    total_requests: AtomicU64,
    failures: AtomicU64,
    /// Weight kept by the history on each sample.
    alpha: f64,
    ewma_ms: AtomicU64,
    circuit: CircuitBreaker,
}

impl EndpointStats {
    pub fn new(alpha: f64, availability: &AvailabilityConfig) -> Self {
        Self {
            active_requests: AtomicUsize::new(0),
            total_requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            alpha,
            ewma_ms: AtomicU64::new(NO_SAMPLE.to_bits()),
            circuit: CircuitBreaker::new(availability),
        }
    }

    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_active(&self) {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_active(&self) {
        // Never wraps below zero.
        let _ = self
            .active_requests
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn circuit(&self) -> &CircuitBreaker {
        &self.circuit
    }

    /// Current response-time estimate in milliseconds, `None` before the first sample.
    pub fn response_time_ms(&self) -> Option<f64> {
        let v = f64::from_bits(self.ewma_ms.load(Ordering::Relaxed));
        (v >= 0.0).then_some(v)
    }

    /// Record a finished request.
    pub fn record(&self, success: bool, latency: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.circuit.record_success();
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
            if let Some(open_for) = self.circuit.record_failure() {
                tracing::debug!(open_ms = open_for.as_millis() as u64, "Circuit opened");
            }
        }
        self.observe_latency(latency.as_micros() as f64 / 1000.0);
    }

    fn observe_latency(&self, sample_ms: f64) {
        let mut current_bits = self.ewma_ms.load(Ordering::Acquire);
        loop {
            let current = f64::from_bits(current_bits);
            let next = if current < 0.0 {
                sample_ms
            } else {
                current * self.alpha + sample_ms * (1.0 - self.alpha)
            };

            match self.ewma_ms.compare_exchange_weak(
                current_bits,
                next.to_bits(),
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current_bits = actual,
            }
        }
    }
}
