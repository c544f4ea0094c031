//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! probe.toml (path from PROBE_CONFIG, optional)
//!     → loader.rs (parse & deserialize)
//!     → env overrides (PORT, PROBE_TAGS)
//!     → validation.rs (semantic checks)
//!     → ProbeConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; a run never sees it change
//! - All fields have defaults so an absent file is a valid config
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, load_from_env, ConfigError};
pub use schema::{
    CredentialsConfig, ObservabilityConfig, ProbeConfig, ProbesConfig, ServerConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
