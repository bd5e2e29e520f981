//! Exponential backoff guard for fallible operations.
//!
//! A [`BackoffGuard`] wraps one operation. After the operation fails, calls
//! are rejected with [`InBackoff`] until a cooldown has passed; the cooldown
//! starts at 2s and doubles with each further failure up to a cap (one hour by
//! default). A success after a cooldown clears it.

pub mod config;
pub mod observability;
pub mod resilience;

pub use config::{BackoffConfig, GuardConfig};
pub use resilience::{
    BackoffGuard, BackoffState, GuardError, GuardPhase, InBackoff, SharedBackoffGuard,
    ZeroMaxBackoff, DEFAULT_MAX_BACKOFF,
};
