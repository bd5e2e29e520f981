//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Guards produce:
//!     → tracing events (target "backoff_guard")
//!     → metrics.rs (rejection / failure / reset counters)
//!
//! Host binary (optional):
//!     → logging.rs::init_logging (syslog or stderr)
//!     → its own metrics recorder
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder on its own
//! - Sink selection is the host's call; `init_logging` is a convenience

pub mod logging;
pub mod metrics;
