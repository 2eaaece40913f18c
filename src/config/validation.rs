//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks on values the binder accepted syntactically
//! - Validate value ranges (ports fit in u16, durations non-negative)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: &AppConfig → Result<(), Vec<ValidationError>>
//! - The retry budget is not checked here; the retryer rejects it itself

use crate::config::schema::AppConfig;

/// A single semantic problem with a bound value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{key}: {message}")]
pub struct ValidationError {
    pub key: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

/// Validate a bound configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_port(&mut errors, "DATABASE_PORT", &config.database.port);
    check_port(&mut errors, "HTTP_PORT", config.http.port.trim_start_matches(':'));

    if config.http.shutdown_grace_period < 0 {
        errors.push(ValidationError::new(
            "HTTP_SHUTDOWN_GRACE_PERIOD",
            "must not be negative",
        ));
    }

    if config.http.request_timeout < 0 {
        errors.push(ValidationError::new("HTTP_REQUEST_TIMEOUT", "must not be negative"));
    }

    if config.database.retry_deadline_ms < 0 {
        errors.push(ValidationError::new(
            "DATABASE_RETRY_DEADLINE_MS",
            "must not be negative",
        ));
    }

    if config.database.max_connections < 0 {
        errors.push(ValidationError::new("DATABASE_MAX_CONNECTIONS", "must not be negative"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_port(errors: &mut Vec<ValidationError>, key: &'static str, value: &str) {
    if value.parse::<u16>().is_err() {
        errors.push(ValidationError::new(
            key,
            format!("'{}' is not a valid port", value),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.database.port = "5432".into();
        cfg.http.port = ":8080".into();
        cfg.http.shutdown_grace_period = 5;
        cfg
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut cfg = valid();
        cfg.database.port = "postgres".into();
        cfg.http.port = "70000".into();
        cfg.http.shutdown_grace_period = -1;

        let errors = validate_config(&cfg).unwrap_err();

        let keys: Vec<_> = errors.iter().map(|e| e.key).collect();
        assert_eq!(
            keys,
            vec!["DATABASE_PORT", "HTTP_PORT", "HTTP_SHUTDOWN_GRACE_PERIOD"]
        );
    }

    #[test]
    fn test_zero_retry_budget_is_left_to_retryer() {
        let mut cfg = valid();
        cfg.database.connection_retry = 0;
        assert!(validate_config(&cfg).is_ok());
    }
}
