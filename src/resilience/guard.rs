//! Backoff guard around a single fallible operation.
//!
//! # Responsibilities
//! - Reject calls while a cooldown is running, without touching the operation
//! - Run the operation otherwise and hand back its result unchanged
//! - Start or extend the cooldown on failure, clear it on success
//! - Report each transition to `tracing` and `metrics`
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use backoff_guard::{BackoffGuard, GuardError};
//! use tracing::level_filters::LevelFilter;
//!
//! let mut guard = BackoffGuard::with_settings(
//!     Duration::from_secs(60),
//!     LevelFilter::INFO,
//!     |host: &str| -> Result<usize, String> { Err(format!("{host} unreachable")) },
//! )
//! .unwrap();
//!
//! assert!(matches!(guard.call("db-1"), Err(GuardError::Operation(_))));
//! assert!(matches!(guard.call("db-1"), Err(GuardError::InBackoff(_))));
//! ```

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::level_filters::LevelFilter;
use tracing::Level;

use crate::config::loader::ConfigError;
use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_guard, ValidationError};
use crate::observability::metrics;
use crate::resilience::backoff::{BackoffState, GuardPhase, DEFAULT_MAX_BACKOFF};
use crate::resilience::error::{GuardError, InBackoff, ZeroMaxBackoff};

/// Tracing target for guard events.
pub const LOG_TARGET: &str = "backoff_guard";

/// Wraps one operation and throttles it after failures.
///
/// The operation takes a single argument; pass a tuple when it needs several
/// and `()` when it needs none.
#[derive(Debug)]
pub struct BackoffGuard<F> {
    operation: F,
    pub(crate) state: BackoffState,
    log_level: LevelFilter,
}

impl<F> BackoffGuard<F> {
    /// Guard `operation` with a one hour cap and `INFO` verbosity.
    pub fn new(operation: F) -> Self {
        Self {
            operation,
            state: BackoffState::default(),
            log_level: LevelFilter::INFO,
        }
    }

    /// Guard `operation` with a custom cap and verbosity.
    ///
    /// Fails when `max_backoff` is zero, since such a guard would never reject a call.
    pub fn with_settings(
        max_backoff: Duration,
        log_level: LevelFilter,
        operation: F,
    ) -> Result<Self, ZeroMaxBackoff> {
        Ok(Self {
            operation,
            state: BackoffState::new(max_backoff)?,
            log_level,
        })
    }

    /// Build a guard from validated configuration.
    pub fn from_config(config: &GuardConfig, operation: F) -> Result<Self, ConfigError> {
        let log_level = validate_guard(config).map_err(ConfigError::Validation)?;
        Self::with_settings(config.max_backoff(), log_level, operation)
            .map_err(|_| ConfigError::Validation(vec![ValidationError::ZeroMaxBackoff]))
    }

    pub fn state(&self) -> &BackoffState {
        &self.state
    }

    pub fn max_backoff(&self) -> Duration {
        self.state.max_backoff()
    }

    pub fn backoff_time(&self) -> Option<Duration> {
        self.state.backoff_time()
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.state.start_time()
    }

    pub fn phase(&self) -> GuardPhase {
        self.state.phase_at(Instant::now())
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Give back the wrapped operation.
    pub fn into_inner(self) -> F {
        self.operation
    }

    /// Invoke the operation unless a cooldown is running.
    pub fn call<A, T, E>(&mut self, args: A) -> Result<T, GuardError<E>>
    where
        F: FnMut(A) -> Result<T, E>,
    {
        self.admit(Instant::now())?;
        let outcome = (self.operation)(args);
        self.observe(outcome)
    }

    /// Invoke an async operation unless a cooldown is running.
    ///
    /// The future runs to completion; state is updated once it resolves.
    pub async fn call_async<A, T, E, Fut>(&mut self, args: A) -> Result<T, GuardError<E>>
    where
        F: FnMut(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.admit(Instant::now())?;
        let outcome = (self.operation)(args).await;
        self.observe(outcome)
    }

    fn admit(&self, now: Instant) -> Result<(), InBackoff> {
        self.state.check(now).inspect_err(|rejection| {
            metrics::record_rejection();
            if self.enabled(Level::DEBUG) {
                tracing::debug!(
                    target: LOG_TARGET,
                    elapsed_secs = rejection.elapsed.as_secs_f64(),
                    backoff_secs = rejection.backoff_time.as_secs_f64(),
                    "elapsed time less than backoff time ({:?} < {:?})",
                    rejection.elapsed,
                    rejection.backoff_time,
                );
            }
        })
    }

    fn observe<T, E>(&mut self, outcome: Result<T, E>) -> Result<T, GuardError<E>> {
        match outcome {
            Ok(value) => {
                if self.state.record_success() {
                    metrics::record_reset();
                    if self.enabled(Level::DEBUG) {
                        tracing::debug!(target: LOG_TARGET, "success, reset backoff");
                    }
                }
                Ok(value)
            }
            Err(err) => {
                let backoff = self.state.record_failure(Instant::now());
                metrics::record_failure();
                if self.enabled(Level::WARN) {
                    tracing::warn!(
                        target: LOG_TARGET,
                        backoff_secs = backoff.as_secs_f64(),
                        "exception raised, backoff {:?}",
                        backoff,
                    );
                }
                Err(GuardError::Operation(err))
            }
        }
    }

    fn enabled(&self, level: Level) -> bool {
        self.log_level >= level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn backdate(guard: &mut BackoffGuard<impl Sized>, by: Duration) {
        guard.state.start_time = Instant::now().checked_sub(by);
        assert!(guard.state.start_time.is_some());
    }

    fn fails_without_arg(a: Option<i32>) -> Result<i32, &'static str> {
        a.ok_or("no value")
    }

    #[test]
    fn test_basic_call_passes_through() {
        let mut guard = BackoffGuard::with_settings(
            Duration::from_secs(7200),
            LevelFilter::INFO,
            |a: i32| -> Result<i32, ()> { Ok(a) },
        )
        .unwrap();

        assert_eq!(guard.call(1).unwrap(), 1);
        assert_eq!(guard.backoff_time(), None);
        assert_eq!(guard.start_time(), None);
        assert_eq!(guard.phase(), GuardPhase::Idle);
    }

    #[test]
    fn test_failure_sets_two_second_backoff() {
        let mut guard = BackoffGuard::new(|_: i32| -> Result<(), &'static str> { Err("boom") });

        let err = guard.call(1).unwrap_err();
        assert_eq!(err.operation_error(), Some(&"boom"));
        assert_eq!(guard.backoff_time(), Some(Duration::from_secs(2)));
        assert!(guard.start_time().is_some());
    }

    #[test]
    fn test_call_during_cooldown_is_rejected() {
        let calls = Cell::new(0);
        let mut guard = BackoffGuard::new(|_: i32| -> Result<(), &'static str> {
            calls.set(calls.get() + 1);
            Err("boom")
        });

        let _ = guard.call(1);
        assert_eq!(calls.get(), 1);

        let err = guard.call(1).unwrap_err();
        assert!(err.is_in_backoff());
        assert_eq!(calls.get(), 1);
        // Rejection leaves the cooldown untouched.
        assert_eq!(guard.backoff_time(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_backoff_elapsed_admits_call() {
        let mut guard = BackoffGuard::new(fails_without_arg);
        let _ = guard.call(None);

        backdate(&mut guard, Duration::from_secs(2));
        assert_eq!(guard.phase(), GuardPhase::Elapsed);
        assert_eq!(guard.call(Some(1)).unwrap(), 1);
        assert_eq!(guard.phase(), GuardPhase::Idle);
    }

    #[test]
    fn test_backoff_elapsed_fails_again() {
        let mut guard = BackoffGuard::new(fails_without_arg);
        let _ = guard.call(None);

        backdate(&mut guard, Duration::from_secs(2));
        let err = guard.call(None).unwrap_err();
        assert_eq!(err.operation_error(), Some(&"no value"));
        assert_eq!(guard.backoff_time(), Some(Duration::from_secs(4)));
        assert_eq!(guard.phase(), GuardPhase::Cooling);
    }

    #[test]
    fn test_success_after_cooldown_resets() {
        let mut guard = BackoffGuard::new(|_: ()| -> Result<(), ()> { Ok(()) });
        guard.state.backoff_time = Some(Duration::from_secs(2));
        backdate(&mut guard, Duration::from_secs(3));

        guard.call(()).unwrap();
        assert_eq!(guard.backoff_time(), None);
        assert_eq!(guard.start_time(), None);
    }

    #[test]
    fn test_repeated_elapsed_failures_reach_cap() {
        let mut guard = BackoffGuard::with_settings(
            Duration::from_secs(10),
            LevelFilter::OFF,
            |_: ()| -> Result<(), ()> { Err(()) },
        )
        .unwrap();

        let mut seen = Vec::new();
        for _ in 0..5 {
            let _ = guard.call(());
            seen.push(guard.backoff_time().unwrap().as_secs());
            backdate(&mut guard, Duration::from_secs(10));
        }
        assert_eq!(seen, vec![2, 4, 8, 10, 10]);
    }

    #[test]
    fn test_zero_max_backoff_is_rejected() {
        let guard = BackoffGuard::with_settings(
            Duration::ZERO,
            LevelFilter::INFO,
            |_: ()| -> Result<(), ()> { Err(()) },
        );
        assert_eq!(guard.err(), Some(ZeroMaxBackoff));

        let mut guard = BackoffGuard::with_settings(
            Duration::from_millis(500),
            LevelFilter::INFO,
            |_: ()| -> Result<(), ()> { Err(()) },
        )
        .unwrap();
        let _ = guard.call(());
        assert_eq!(guard.backoff_time(), Some(Duration::from_millis(500)));
        assert!(guard.call(()).unwrap_err().is_in_backoff());
    }

    #[test]
    fn test_tuple_arguments_and_into_inner() {
        let mut guard = BackoffGuard::new(|(a, b): (i32, i32)| -> Result<i32, ()> { Ok(a + b) });
        assert_eq!(guard.call((2, 3)).unwrap(), 5);

        let mut add = guard.into_inner();
        assert_eq!(add((1, 1)), Ok(2));
    }

    #[test]
    fn test_from_config() {
        let config = GuardConfig {
            max_backoff_secs: 120,
            log_level: "warn".to_string(),
        };
        let guard = BackoffGuard::from_config(&config, |_: ()| -> Result<(), ()> { Ok(()) }).unwrap();
        assert_eq!(guard.max_backoff(), Duration::from_secs(120));
        assert_eq!(guard.log_level(), LevelFilter::WARN);

        let bad = GuardConfig {
            max_backoff_secs: 0,
            log_level: "loud".to_string(),
        };
        match BackoffGuard::from_config(&bad, |_: ()| -> Result<(), ()> { Ok(()) }) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation errors, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_call_async_follows_same_transitions() {
        let mut guard = BackoffGuard::new(|a: Option<i32>| async move { a.ok_or("no value") });

        let err = guard.call_async(None).await.unwrap_err();
        assert!(!err.is_in_backoff());
        assert_eq!(guard.backoff_time(), Some(Duration::from_secs(2)));

        let err = guard.call_async(Some(1)).await.unwrap_err();
        assert!(err.is_in_backoff());

        backdate(&mut guard, Duration::from_secs(2));
        assert_eq!(guard.call_async(Some(7)).await.unwrap(), 7);
        assert_eq!(guard.backoff_time(), None);
    }
}
