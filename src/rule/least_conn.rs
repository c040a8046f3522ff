//! Least-connections selection.

use std::sync::Arc;

use crate::error::Result;
use crate::registry::Endpoint;
use crate::rule::{SelectionContext, SelectionRule};

/// Selects the candidate with the fewest in-flight requests.
/// Ties go to the first one (stability).
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastConnections;

impl SelectionRule for LeastConnections {
    fn name(&self) -> &'static str {
        "least_connections"
    }

    fn choose(&self, ctx: &SelectionContext<'_>) -> Result<Arc<Endpoint>> {
        ctx.candidates
            .iter()
            .min_by_key(|e| e.stats().active_requests())
            .cloned()
            .ok_or_else(|| ctx.no_endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::test_support::{endpoints, pick};

    #[test]
    fn test_least_conn() {
        let candidates = endpoints(&["a", "b"]);

        let _a1 = candidates[0].begin_request();
        assert_eq!(pick(&LeastConnections, &candidates).unwrap(), "b");

        let _b1 = candidates[1].begin_request();
        let _b2 = candidates[1].begin_request();
        assert_eq!(pick(&LeastConnections, &candidates).unwrap(), "a");
    }
}
