//! Availability-filtering selection.
//!
//! Skips candidates whose circuit breaker is open or that already carry
//! `max_active_requests` in-flight requests, then round-robins over the
//! rest. If every candidate is skipped the rotation runs over all of them;
//! health has already been checked, so a busy endpoint beats no endpoint.

use std::sync::Arc;

use crate::error::Result;
use crate::registry::Endpoint;
use crate::rule::{RoundRobin, SelectionContext, SelectionRule};

#[derive(Debug)]
pub struct AvailabilityFiltering {
    max_active_requests: usize,
    rotation: RoundRobin,
}

impl AvailabilityFiltering {
    pub fn new(max_active_requests: usize) -> Self {
        Self {
            max_active_requests,
            rotation: RoundRobin::new(),
        }
    }

    fn is_usable(&self, endpoint: &Endpoint) -> bool {
        !endpoint.stats().circuit().is_open()
            && endpoint.stats().active_requests() < self.max_active_requests
    }
}

impl SelectionRule for AvailabilityFiltering {
    fn name(&self) -> &'static str {
        "availability_filtering"
    }

    fn choose(&self, ctx: &SelectionContext<'_>) -> Result<Arc<Endpoint>> {
        if ctx.candidates.is_empty() {
            return Err(ctx.no_endpoint());
        }

        let usable: Vec<Arc<Endpoint>> = ctx
            .candidates
            .iter()
            .filter(|e| self.is_usable(e))
            .cloned()
            .collect();

        let pool: &[Arc<Endpoint>] = if usable.is_empty() {
            tracing::debug!(service = ctx.service, "All candidates saturated or tripped");
            ctx.candidates
        } else {
            &usable
        };

        let index = self.rotation.next_index(pool.len());
        Ok(pool[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::test_support::{endpoints, pick};
    use std::time::Duration;

    #[test]
    fn test_skips_open_circuit() {
        let rule = AvailabilityFiltering::new(10);
        let candidates = endpoints(&["a", "b"]);
        for _ in 0..3 {
            candidates[0].stats().record(false, Duration::from_millis(1));
        }
        for _ in 0..5 {
            assert_eq!(pick(&rule, &candidates).unwrap(), "b");
        }
    }

    #[test]
    fn test_skips_saturated() {
        let rule = AvailabilityFiltering::new(1);
        let candidates = endpoints(&["a", "b"]);
        let _busy = candidates[1].begin_request();
        for _ in 0..5 {
            assert_eq!(pick(&rule, &candidates).unwrap(), "a");
        }
    }

    #[test]
    fn test_falls_back_when_everything_skipped() {
        let rule = AvailabilityFiltering::new(1);
        let candidates = endpoints(&["a", "b"]);
        let _g1 = candidates[0].begin_request();
        let _g2 = candidates[1].begin_request();
        let seq: Vec<String> = (0..2).map(|_| pick(&rule, &candidates).unwrap()).collect();
        assert_eq!(seq, vec!["a", "b"]);
    }
}
