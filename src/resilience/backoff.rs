//! Cooldown state for a single guard.
//!
//! # State Machine
//! ```text
//! Idle    → failure → Cooling (backoff 2s)
//! Cooling → call    → rejected, stays Cooling
//! Elapsed → success → Idle (reset)
//! Elapsed → failure → Cooling (backoff doubled, capped)
//! ```
//!
//! `Elapsed` is not stored: it is `Cooling` observed after the cooldown ran out.

use std::time::{Duration, Instant};

use crate::resilience::error::{InBackoff, ZeroMaxBackoff};

/// Default cap on the cooldown (one hour).
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// Value an absent cooldown is treated as before doubling.
const BASELINE: Duration = Duration::from_secs(1);

/// Phase of a guard at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    /// No failure tracked; every call is admitted.
    Idle,
    /// A failure is tracked and its cooldown is still running.
    Cooling,
    /// A failure is tracked but its cooldown has run out.
    Elapsed,
}

/// Failure tracking for one guarded operation.
///
/// `backoff_time` and `start_time` are always both set or both clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffState {
    max_backoff: Duration,
    pub(crate) backoff_time: Option<Duration>,
    pub(crate) start_time: Option<Instant>,
}

impl BackoffState {
    /// Create an idle state capped at `max_backoff`, which must be non-zero.
    pub fn new(max_backoff: Duration) -> Result<Self, ZeroMaxBackoff> {
        if max_backoff.is_zero() {
            return Err(ZeroMaxBackoff);
        }
        Ok(Self::idle(max_backoff))
    }

    fn idle(max_backoff: Duration) -> Self {
        Self {
            max_backoff,
            backoff_time: None,
            start_time: None,
        }
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Current cooldown, `None` while idle.
    pub fn backoff_time(&self) -> Option<Duration> {
        self.backoff_time
    }

    /// When the tracked failure was observed, `None` while idle.
    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    pub fn phase_at(&self, now: Instant) -> GuardPhase {
        match self.check(now) {
            Err(_) => GuardPhase::Cooling,
            Ok(()) if self.start_time.is_some() => GuardPhase::Elapsed,
            Ok(()) => GuardPhase::Idle,
        }
    }

    /// Cooldown left at `now`, `None` unless cooling.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.check(now).err().map(|rejection| rejection.remaining())
    }

    /// Admit or reject a call arriving at `now`.
    pub(crate) fn check(&self, now: Instant) -> Result<(), InBackoff> {
        let (Some(start_time), Some(backoff_time)) = (self.start_time, self.backoff_time) else {
            return Ok(());
        };

        let elapsed = now.saturating_duration_since(start_time);
        if elapsed < backoff_time {
            return Err(InBackoff {
                start_time,
                elapsed,
                backoff_time,
            });
        }
        Ok(())
    }

    /// Track a failure observed at `now`. Returns the new cooldown.
    pub(crate) fn record_failure(&mut self, now: Instant) -> Duration {
        self.start_time = Some(now);
        self.bump()
    }

    /// Clear a tracked failure. Returns whether anything was cleared.
    pub(crate) fn record_success(&mut self) -> bool {
        if self.backoff_time.is_none() {
            return false;
        }
        self.reset();
        true
    }

    /// Double the cooldown (an absent one counts as 1s), capped at `max_backoff`.
    pub(crate) fn bump(&mut self) -> Duration {
        let next = self
            .backoff_time
            .unwrap_or(BASELINE)
            .saturating_mul(2)
            .min(self.max_backoff);
        self.backoff_time = Some(next);
        next
    }

    pub(crate) fn reset(&mut self) {
        self.start_time = None;
        self.backoff_time = None;
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::idle(DEFAULT_MAX_BACKOFF)
    }
}
