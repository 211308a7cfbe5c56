//! Action Gate
//!
//! Debounces discrete, externally triggered commands (menu actions). At most
//! one action runs at a time, and after it completes the gate stays closed for
//! a cooldown. Rejected calls are not queued or retried.
//!
//! ```text
//!   execute ──► [in progress] ──complete──► [cooldown 0.5 s] ──► open
//!                    │                            │
//!                    └──── execute → Busy ────────┘
//! ```

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Cooldown that follows every completed action
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);

/// The gate refused an action
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("another action is in progress or cooling down")]
pub struct Busy;

/// Proof that an action was admitted; hand it back to [`ActionGate::complete`]
#[derive(Debug)]
#[must_use = "an admitted action must be completed"]
pub struct GatePermit {
    admitted_at: Instant,
}

/// Single-flight gate with cooldown
#[derive(Debug, Clone)]
pub struct ActionGate {
    in_progress: bool,
    cooldown_until: Option<Instant>,
    cooldown: Duration,
}

impl Default for ActionGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl ActionGate {
    /// Create a gate with the given cooldown
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            in_progress: false,
            cooldown_until: None,
            cooldown,
        }
    }

    /// Cooldown length
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether an action would be rejected at `now`
    #[must_use]
    pub fn is_busy(&self, now: Instant) -> bool {
        self.in_progress || self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Admit an action, or refuse with [`Busy`]
    pub fn try_enter(&mut self, now: Instant) -> Result<GatePermit, Busy> {
        if self.is_busy(now) {
            return Err(Busy);
        }
        self.in_progress = true;
        self.cooldown_until = None;
        Ok(GatePermit { admitted_at: now })
    }

    /// Mark the admitted action complete and start the cooldown
    pub fn complete(&mut self, permit: GatePermit, now: Instant) {
        let finished = now.max(permit.admitted_at);
        self.in_progress = false;
        self.cooldown_until = Some(finished + self.cooldown);
    }

    /// Run `action` through the gate
    ///
    /// The cooldown starts when `action` returns.
    pub fn execute<R>(&mut self, now: Instant, action: impl FnOnce() -> R) -> Result<R, Busy> {
        let permit = self.try_enter(now)?;
        let result = action();
        self.complete(permit, Instant::now().max(now));
        Ok(result)
    }
}
