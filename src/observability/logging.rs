//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once, from `main`
//! - Translate `LOG_LEVEL` into an `EnvFilter` directive
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides `LOG_LEVEL` when set
//! - Library code never installs a subscriber; tests scope their own

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Normalize a level name. Accepts `warning` and any casing.
pub fn normalize_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" | "" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Filter directive for this crate and its HTTP stack.
pub fn filter_directive(level: &str) -> String {
    let level = normalize_level(level).unwrap_or("info");
    format!("user_service={level},tower_http={level},sqlx=warn")
}

/// Install the global subscriber.
pub fn init(level: &str) -> Result<(), TryInitError> {
    if normalize_level(level).is_none() {
        eprintln!("unknown LOG_LEVEL '{}', falling back to info", level);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_directive(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
