//! User service library.
//!
//! A small CRUD HTTP API over a `users` table, with environment-driven
//! configuration and retried database bootstrap.

pub mod config;
pub mod database;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use database::{Database, UserStore};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
