//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → ping.rs strategy per endpoint (under timeout)
//!     → state.rs policy (hysteresis)
//!
//! Passive health checks (passive.rs):
//!     Request outcome reported by the caller
//!     → stats + circuit breaker
//!     → immediate Down on hard failure
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - State transitions require consecutive successes/failures
//! - Health state is per-endpoint, stored in an atomic cell

pub mod active;
pub mod passive;
pub mod ping;
pub mod state;

pub use active::HealthProber;
pub use passive::{record_outcome, Outcome};
pub use ping::{build_ping, HttpPing, NoopPing, Ping, TcpPing};
pub use state::{HealthPolicy, ProbeOutcome, ProbeResult};
