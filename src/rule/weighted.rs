//! Weighted response-time selection.
//!
//! Each candidate gets a score of `weight / (ewma_ms + 1)` and is sampled
//! proportionally to it, so faster endpoints take more traffic without
//! starving slower ones. Candidates that have no latency sample yet are
//! scored with the mean of the sampled ones. With no samples at all the
//! rule behaves as plain round robin.

use std::sync::Arc;

use rand::Rng;

use crate::error::Result;
use crate::registry::Endpoint;
use crate::rule::{RoundRobin, SelectionContext, SelectionRule};

#[derive(Debug, Default)]
pub struct WeightedResponseTime {
    warmup: RoundRobin,
}

impl WeightedResponseTime {
    pub fn new() -> Self {
        Self::default()
    }

    fn scores(candidates: &[Arc<Endpoint>]) -> Option<Vec<f64>> {
        let samples: Vec<Option<f64>> = candidates
            .iter()
            .map(|e| e.stats().response_time_ms())
            .collect();

        let known: Vec<f64> = samples.iter().flatten().copied().collect();
        if known.is_empty() {
            return None;
        }
        let mean = known.iter().sum::<f64>() / known.len() as f64;

        Some(
            candidates
                .iter()
                .zip(samples)
                .map(|(e, rt)| e.weight() as f64 / (rt.unwrap_or(mean) + 1.0))
                .collect(),
        )
    }
}

impl SelectionRule for WeightedResponseTime {
    fn name(&self) -> &'static str {
        "weighted_response_time"
    }

    fn choose(&self, ctx: &SelectionContext<'_>) -> Result<Arc<Endpoint>> {
        if ctx.candidates.is_empty() {
            return Err(ctx.no_endpoint());
        }

        let Some(scores) = Self::scores(ctx.candidates) else {
            return self.warmup.choose(ctx);
        };

        let total: f64 = scores.iter().sum();
        let mut point = rand::thread_rng().gen_range(0.0..total);
        for (endpoint, score) in ctx.candidates.iter().zip(&scores) {
            if point < *score {
                return Ok(endpoint.clone());
            }
            point -= score;
        }
        // Float rounding can leave `point` just past the last bucket.
        Ok(ctx.candidates[ctx.candidates.len() - 1].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::test_support::{endpoints, pick};
    use std::time::Duration;

    #[test]
    fn test_round_robin_before_samples() {
        let rule = WeightedResponseTime::new();
        let candidates = endpoints(&["a", "b"]);
        let seq: Vec<String> = (0..4).map(|_| pick(&rule, &candidates).unwrap()).collect();
        assert_eq!(seq, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_prefers_faster_endpoint() {
        let rule = WeightedResponseTime::new();
        let candidates = endpoints(&["fast", "slow"]);
        candidates[0].stats().record(true, Duration::from_millis(1));
        candidates[1].stats().record(true, Duration::from_millis(199));

        let fast = (0..2000)
            .filter(|_| pick(&rule, &candidates).unwrap() == "fast")
            .count();
        // Expected share is 100/101; leave plenty of slack.
        assert!(fast > 1800, "fast picked only {fast} times");
    }

    #[test]
    fn test_unsampled_endpoint_uses_mean() {
        let candidates = endpoints(&["a", "b"]);
        candidates[0].stats().record(true, Duration::from_millis(9));
        let scores = WeightedResponseTime::scores(&candidates).unwrap();
        assert_eq!(scores, vec![0.1, 0.1]);
    }
}
