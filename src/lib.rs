//! Client-side load balancer library.

pub mod balancer;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod rule;

pub use balancer::{BalancerFactory, BalancerState, BalancerStats, LoadBalancer, ServiceBalancer};
pub use config::schema::BalancerConfig;
pub use discovery::{Discovery, ServiceInstance};
pub use error::{LbError, Result};
pub use health::Outcome;
pub use lifecycle::Shutdown;
pub use registry::{Endpoint, EndpointId, HealthStatus};
pub use rule::RequestContext;
