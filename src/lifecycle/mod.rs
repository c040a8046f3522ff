//! Process and task lifecycle helpers.
//!
//! # Data Flow
//! ```text
//! LoadBalancer::start()
//!     → Shutdown::new(), tasks subscribe, tasks spawned
//! LoadBalancer::stop()
//!     → Shutdown::trigger() → tasks leave their select! loop → joined
//!
//! Agent binary:
//!     signals.rs (SIGINT/SIGTERM) → stop every balancer → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
