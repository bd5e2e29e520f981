//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BackoffConfig (validated, immutable)
//!     → guard settings → BackoffGuard::from_config
//!     → observability settings → observability::logging::init_logging
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BackoffConfig, GuardConfig, LogFormat, ObservabilityConfig, SinkKind};
pub use validation::ValidationError;
