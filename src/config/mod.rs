//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags (clap)            config file (TOML, optional)
//!     → cli.rs                    → loader.rs (parse & deserialize)
//!             ↘                 ↙
//!              resolve_config: file first, flags on top
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the database file reloads, the config does not
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::CliArgs;
pub use loader::{resolve_config, ConfigError};
pub use schema::{LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig, ServerConfig, StorageConfig};
