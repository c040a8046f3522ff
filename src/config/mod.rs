//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → BalancerConfig::service(name): named ServiceConfig or default_service
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → update sent to the agent, which refreshes static discovery
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Per-service config is a whole ServiceConfig, not a field-level merge
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AvailabilityConfig, BalancerConfig, FilterConfig, HealthCheckConfig, InstanceConfig,
    ObservabilityConfig, PingKind, RetryConfig, RuleKind, ServiceConfig,
};
