//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Startup operation (open pool, ping):
//!     → retries.rs (attempt, keep last error, stop on budget or deadline)
//!     → backoff.rs (fixed delay or exponential + jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - Attempts are sequential; the retryer never runs two at once
//! - Misconfiguration and exhaustion are distinct errors
//! - Deadlines cancel the in-flight attempt instead of abandoning it

pub mod backoff;
pub mod retries;

pub use backoff::WaitStrategy;
pub use retries::{retry, InvalidConfiguration, RetryError, RetryPolicy};
