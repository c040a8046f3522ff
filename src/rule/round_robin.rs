//! Round-robin selection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::registry::Endpoint;
use crate::rule::{SelectionContext, SelectionRule};

/// Round-robin selector.
///
/// Cursor and the candidate count it was computed for share one atomic
/// word, so concurrent callers are serialized and a change in the count
/// restarts the rotation at index 0.
#[derive(Debug, Default)]
pub struct RoundRobin {
    /// High 32 bits: candidate count, low 32 bits: next index.
    state: AtomicU64,
}

fn pack(len: usize, cursor: usize) -> u64 {
    ((len as u64) << 32) | (cursor as u64 & 0xFFFF_FFFF)
}

fn unpack(state: u64) -> (usize, usize) {
    ((state >> 32) as usize, (state & 0xFFFF_FFFF) as usize)
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next index for a list of `len` (> 0) entries.
    pub fn next_index(&self, len: usize) -> usize {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let (last_len, cursor) = unpack(current);
            let index = if last_len == len { cursor % len } else { 0 };
            let next = pack(len, (index + 1) % len);

            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return index,
                Err(actual) => current = actual,
            }
        }
    }
}

impl SelectionRule for RoundRobin {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn choose(&self, ctx: &SelectionContext<'_>) -> Result<Arc<Endpoint>> {
        if ctx.candidates.is_empty() {
            return Err(ctx.no_endpoint());
        }
        let index = self.next_index(ctx.candidates.len());
        Ok(ctx.candidates[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::test_support::{endpoints, pick};
    use std::collections::HashSet;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = endpoints(&["a", "b", "c"]);

        let seq: Vec<String> = (0..6).map(|_| pick(&lb, &backends).unwrap()).collect();
        assert_eq!(seq, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_cursor_resets_on_size_change() {
        let lb = RoundRobin::new();
        let abc = endpoints(&["a", "b", "c"]);
        assert_eq!(pick(&lb, &abc).unwrap(), "a");
        assert_eq!(pick(&lb, &abc).unwrap(), "b");

        let ac = vec![abc[0].clone(), abc[2].clone()];
        let seq: Vec<String> = (0..4).map(|_| pick(&lb, &ac).unwrap()).collect();
        assert_eq!(seq, vec!["a", "c", "a", "c"]);
    }

    #[test]
    fn test_concurrent_callers_visit_each_once_per_cycle() {
        let lb = Arc::new(RoundRobin::new());
        let n = 8;
        let rounds = 250;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lb = lb.clone();
                std::thread::spawn(move || {
                    (0..rounds * n / 4)
                        .map(|_| lb.next_index(n))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts = vec![0usize; n];
        for h in handles {
            for i in h.join().unwrap() {
                counts[i] += 1;
            }
        }
        assert!(counts.iter().all(|&c| c == rounds));

        // A single caller after the storm still sees a full cycle.
        let cycle: HashSet<usize> = (0..n).map(|_| lb.next_index(n)).collect();
        assert_eq!(cycle.len(), n);
    }
}
