//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! execute_with_retry (retries.rs):
//!     → choose endpoint → run operation → report outcome
//!     → on failure: backoff.rs delay, choose again
//!
//! report_outcome:
//!     → circuit_breaker.rs (per endpoint, opened by consecutive failures)
//!     → availability rule skips endpoints with an open circuit
//! ```
//!
//! # Design Decisions
//! - Every selection is fresh: a retry may land on another endpoint
//! - Circuit breaker is per endpoint, not global

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use retries::{execute_with_retry, AttemptError, RetryError};
