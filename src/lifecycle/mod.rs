//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     AppConfig → connect database → build server → bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain within grace period → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Bootstrap returns errors; only `or_exit` at the entry point terminates
//! - Ordered startup: config first, then storage, then listener
//! - Shutdown has a deadline: the server reports an error after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{bootstrap, fatal_message, or_exit, Service, StartupError, Storage};
