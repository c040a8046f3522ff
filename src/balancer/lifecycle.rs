//! Balancer lifecycle state.
//!
//! # State Transitions
//! ```text
//! Stopped → Starting → Running → Stopping → Stopped
//! ```
//! Transitions are compare-and-swap, so concurrent `start()`/`stop()` calls
//! cannot both win.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BalancerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl From<u8> for BalancerState {
    fn from(val: u8) -> Self {
        match val {
            1 => BalancerState::Starting,
            2 => BalancerState::Running,
            3 => BalancerState::Stopping,
            _ => BalancerState::Stopped,
        }
    }
}

#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(BalancerState::Stopped as u8))
    }

    pub fn get(&self) -> BalancerState {
        BalancerState::from(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: BalancerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from → to`. On failure returns the actual current state.
    pub fn transition(&self, from: BalancerState, to: BalancerState) -> Result<(), BalancerState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(drop)
            .map_err(BalancerState::from)
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), BalancerState::Stopped);

        assert!(cell.transition(BalancerState::Stopped, BalancerState::Starting).is_ok());
        assert_eq!(
            cell.transition(BalancerState::Stopped, BalancerState::Starting),
            Err(BalancerState::Starting)
        );

        cell.set(BalancerState::Running);
        assert!(cell.transition(BalancerState::Running, BalancerState::Stopping).is_ok());
        assert_eq!(cell.get(), BalancerState::Stopping);
    }
}
