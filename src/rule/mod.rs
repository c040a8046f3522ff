//! Selection rules.
//!
//! # Data Flow
//! ```text
//! choose() on the balancer
//!     → eligible candidates (filtered, Down removed)
//!     → SelectionRule::choose(SelectionContext):
//!         - round_robin.rs (shared cursor)
//!         - weighted.rs (inverse response time × weight)
//!         - random.rs (uniform)
//!         - availability.rs (skip open circuits / saturated, then round robin)
//!         - least_conn.rs (fewest active requests)
//!     → Arc<Endpoint> or NoAvailableEndpoint
//! ```
//!
//! # Design Decisions
//! - Rules never see Down endpoints; the balancer strips them first
//! - Selection is in-memory only, never awaits
//! - Stateful rules (cursors) are shared across concurrent callers

pub mod availability;
pub mod least_conn;
pub mod random;
pub mod round_robin;
pub mod weighted;

use std::sync::Arc;

use crate::config::{RuleKind, ServiceConfig};
use crate::error::{LbError, Result};
use crate::registry::Endpoint;

pub use availability::AvailabilityFiltering;
pub use least_conn::LeastConnections;
pub use random::RandomRule;
pub use round_robin::RoundRobin;
pub use weighted::WeightedResponseTime;

/// Caller-supplied request data.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Optional routing key (tenant, session, ...).
    pub key: Option<String>,
}

impl RequestContext {
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }
}

/// Per-call selection input. Lives for one `choose()`.
#[derive(Debug)]
pub struct SelectionContext<'a> {
    pub service: &'a str,
    pub candidates: &'a [Arc<Endpoint>],
    pub request: &'a RequestContext,
}

impl SelectionContext<'_> {
    pub(crate) fn no_endpoint(&self) -> LbError {
        LbError::NoAvailableEndpoint {
            service: self.service.to_string(),
        }
    }
}

/// Picks one endpoint per request.
pub trait SelectionRule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn choose(&self, ctx: &SelectionContext<'_>) -> Result<Arc<Endpoint>>;
}

/// Default rule for a service config.
pub fn build_rule(config: &ServiceConfig) -> Arc<dyn SelectionRule> {
    match config.rule {
        RuleKind::RoundRobin => Arc::new(RoundRobin::new()),
        RuleKind::Random => Arc::new(RandomRule),
        RuleKind::WeightedResponseTime => Arc::new(WeightedResponseTime::new()),
        RuleKind::AvailabilityFiltering => Arc::new(AvailabilityFiltering::new(
            config.availability.max_active_requests,
        )),
        RuleKind::LeastConnections => Arc::new(LeastConnections),
    }
}
