//! Guard shared between concurrent callers.
//!
//! The lock is held across the operation, so the admission check and the
//! state update it leads to happen as one step. Calls through clones of the
//! same handle are therefore serialized.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::resilience::backoff::GuardPhase;
use crate::resilience::error::GuardError;
use crate::resilience::guard::BackoffGuard;

/// Cloneable, thread-safe handle to a [`BackoffGuard`].
#[derive(Debug)]
pub struct SharedBackoffGuard<F> {
    inner: Arc<Mutex<BackoffGuard<F>>>,
}

impl<F> SharedBackoffGuard<F> {
    pub fn new(guard: BackoffGuard<F>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(guard)),
        }
    }

    /// Invoke the operation unless a cooldown is running.
    ///
    /// # Deadlocks
    ///
    /// The lock is held while the operation runs. An operation that calls back
    /// into this guard, through this handle or any clone of it, blocks forever.
    pub fn call<A, T, E>(&self, args: A) -> Result<T, GuardError<E>>
    where
        F: FnMut(A) -> Result<T, E>,
    {
        self.lock().call(args)
    }

    pub fn backoff_time(&self) -> Option<Duration> {
        self.lock().backoff_time()
    }

    pub fn phase(&self) -> GuardPhase {
        self.lock().phase()
    }

    // A panic inside the operation poisons the lock before any state update,
    // so the state behind it is still coherent.
    fn lock(&self) -> MutexGuard<'_, BackoffGuard<F>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F> Clone for SharedBackoffGuard<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F> From<BackoffGuard<F>> for SharedBackoffGuard<F> {
    fn from(guard: BackoffGuard<F>) -> Self {
        Self::new(guard)
    }
}
