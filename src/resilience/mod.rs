//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller invokes guard:
//!     → backoff.rs (cooldown running? reject with InBackoff)
//!     → wrapped operation runs
//!     → On failure: backoff.rs bumps cooldown, error returned as-is
//!     → On success: backoff.rs resets, value returned as-is
//! ```
//!
//! # Design Decisions
//! - One guard wraps exactly one operation
//! - The guard decides whether to call; it never retries or sleeps
//! - Rejections and operation failures are distinct error variants
//! - `BackoffGuard` is single-owner; `SharedBackoffGuard` adds a lock for concurrent callers

pub mod backoff;
pub mod error;
pub mod guard;
pub mod shared;

pub use backoff::{BackoffState, GuardPhase, DEFAULT_MAX_BACKOFF};
pub use error::{GuardError, InBackoff, ZeroMaxBackoff};
pub use guard::BackoffGuard;
pub use shared::SharedBackoffGuard;
