//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! Every group lists its own field table through [`EnvBound`].

use std::fmt;
use std::time::Duration;

use crate::config::binder::{Binding, EnvBound};

/// Root configuration for the user service.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Deployment environment name (e.g. "local", "prod").
    pub env: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Prometheus exporter address; exporter disabled when empty.
    pub metrics_address: String,

    /// Database connection settings.
    pub database: DatabaseConfig,

    /// HTTP listener settings.
    pub http: HttpConfig,
}

impl AppConfig {
    /// Log level with the default applied.
    pub fn log_level(&self) -> &str {
        if self.log_level.is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }
}

impl EnvBound for AppConfig {
    fn bindings(&mut self) -> Vec<Binding<'_>> {
        vec![
            Binding::text("ENV", false, &mut self.env),
            Binding::text("LOG_LEVEL", false, &mut self.log_level),
            Binding::text("METRICS_ADDRESS", false, &mut self.metrics_address),
            Binding::group("database", &mut self.database),
            Binding::group("http", &mut self.http),
        ]
    }
}

/// Database connection settings.
#[derive(Clone, Default)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,

    /// Attempt budget for both the open and the ping phase.
    pub connection_retry: i64,

    /// Exponential backoff with jitter instead of a fixed delay.
    pub retry_backoff: bool,

    /// Wall-clock bound per phase in milliseconds (0 = none).
    pub retry_deadline_ms: i64,

    /// Create the `users` table on startup.
    pub run_migrations: bool,

    /// Pool size (0 = default).
    pub max_connections: i64,
}

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

impl DatabaseConfig {
    pub fn retry_deadline(&self) -> Option<Duration> {
        u64::try_from(self.retry_deadline_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    pub fn max_connections(&self) -> u32 {
        u32::try_from(self.max_connections)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connection_retry", &self.connection_retry)
            .field("retry_backoff", &self.retry_backoff)
            .field("retry_deadline_ms", &self.retry_deadline_ms)
            .field("run_migrations", &self.run_migrations)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl EnvBound for DatabaseConfig {
    fn bindings(&mut self) -> Vec<Binding<'_>> {
        vec![
            Binding::text("DATABASE_NAME", true, &mut self.name),
            Binding::text("DATABASE_USER", true, &mut self.user),
            Binding::text("DATABASE_PASSWORD", true, &mut self.password),
            Binding::text("DATABASE_HOST", true, &mut self.host),
            Binding::text("DATABASE_PORT", true, &mut self.port),
            Binding::integer("DATABASE_CONNECTION_RETRY", true, &mut self.connection_retry),
            Binding::boolean("DATABASE_RETRY_BACKOFF", false, &mut self.retry_backoff),
            Binding::integer("DATABASE_RETRY_DEADLINE_MS", false, &mut self.retry_deadline_ms),
            Binding::boolean("DATABASE_RUN_MIGRATIONS", false, &mut self.run_migrations),
            Binding::integer("DATABASE_MAX_CONNECTIONS", false, &mut self.max_connections),
        ]
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Default)]
pub struct HttpConfig {
    /// Host part of the bind address.
    pub domain: String,

    /// Port part of the bind address.
    pub port: String,

    /// Seconds in-flight requests get to finish after a shutdown signal.
    pub shutdown_grace_period: i64,

    /// Per-request timeout in seconds (0 = default).
    pub request_timeout: i64,

    /// Register `/api/health-check`.
    pub health_check: bool,
}

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

impl HttpConfig {
    /// Bind address built from domain and port, e.g. `0.0.0.0:8080`.
    pub fn bind_address(&self) -> String {
        let port = self.port.trim_start_matches(':');
        if self.domain.is_empty() {
            format!("0.0.0.0:{}", port)
        } else {
            format!("{}:{}", self.domain, port)
        }
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.shutdown_grace_period).unwrap_or(0))
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = u64::try_from(self.request_timeout)
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }
}

impl EnvBound for HttpConfig {
    fn bindings(&mut self) -> Vec<Binding<'_>> {
        vec![
            Binding::text("HTTP_DOMAIN", false, &mut self.domain),
            Binding::text("HTTP_PORT", true, &mut self.port),
            Binding::integer("HTTP_SHUTDOWN_GRACE_PERIOD", true, &mut self.shutdown_grace_period),
            Binding::integer("HTTP_REQUEST_TIMEOUT", false, &mut self.request_timeout),
            Binding::boolean("HTTP_HEALTH_CHECK", false, &mut self.health_check),
        ]
    }
}
