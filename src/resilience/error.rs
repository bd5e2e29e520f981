//! Guard error types.
//!
//! A guarded call fails in one of two ways: the guard refused to run the
//! operation, or the operation ran and failed. The second case carries the
//! operation's own error untouched.

use std::time::{Duration, Instant};
use thiserror::Error;

/// A call arrived before the active cooldown elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("in backoff: start_time={start_time:?}, elapsed={elapsed:?}, backoff_time={backoff_time:?}")]
pub struct InBackoff {
    /// When the failure that started this cooldown was observed.
    pub start_time: Instant,
    /// Time since `start_time` at the moment of rejection.
    pub elapsed: Duration,
    /// Length of the active cooldown.
    pub backoff_time: Duration,
}

impl InBackoff {
    /// Time left until the guard admits calls again.
    pub fn remaining(&self) -> Duration {
        self.backoff_time.saturating_sub(self.elapsed)
    }
}

/// A guard was constructed with a zero cooldown cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("max_backoff must be greater than zero")]
pub struct ZeroMaxBackoff;

/// Error returned by a guarded call.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// Rejected by the guard; the operation was not invoked.
    #[error(transparent)]
    InBackoff(#[from] InBackoff),

    /// The operation ran and returned this error.
    #[error(transparent)]
    Operation(E),
}

impl<E> GuardError<E> {
    pub fn is_in_backoff(&self) -> bool {
        matches!(self, GuardError::InBackoff(_))
    }

    /// The rejection details, if the guard refused the call.
    pub fn in_backoff(&self) -> Option<&InBackoff> {
        match self {
            GuardError::InBackoff(rejection) => Some(rejection),
            GuardError::Operation(_) => None,
        }
    }

    pub fn operation_error(&self) -> Option<&E> {
        match self {
            GuardError::Operation(err) => Some(err),
            GuardError::InBackoff(_) => None,
        }
    }

    /// Unwraps the operation's error, handing back the rejection otherwise.
    pub fn into_operation_error(self) -> Result<E, InBackoff> {
        match self {
            GuardError::Operation(err) => Ok(err),
            GuardError::InBackoff(rejection) => Err(rejection),
        }
    }
}
