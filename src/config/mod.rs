//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional, dotenvy)
//!     → process environment
//!     → binder.rs (walk field tables, enforce required)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed by value/reference to bootstrap and server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Every bound field is declared explicitly in schema.rs
//! - Validation separates syntactic (binder) from semantic checks

pub mod binder;
pub mod loader;
pub mod schema;
pub mod validation;

pub use binder::{BindError, EnvBinder, EnvBound, EnvSource, OptionalParse, ProcessEnv};
pub use loader::{load_config, load_env_file, load_from, ConfigError, LoadOptions};
pub use schema::{AppConfig, DatabaseConfig, HttpConfig};
