//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect storage under the configured retry policy
//! - Build the HTTP server and bind its listener
//! - Start the optional metrics exporter
//!
//! # Design Decisions
//! - Every step returns an error; nothing here exits the process
//! - `or_exit` is the only place a startup failure becomes fatal
//! - Listener binds last (traffic only when storage is ready)

use std::fmt::Display;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::{AppConfig, ConfigError};
use crate::database::{Database, DatabaseError, MemoryUserStore, PgUserStore, UserStore};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("invalid metrics address '{address}': {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Where users are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Storage {
    #[default]
    Postgres,
    /// Process-local store; nothing is persisted.
    Memory,
}

/// A bootstrapped service, bound and ready to serve.
pub struct Service {
    server: HttpServer,
    listener: TcpListener,
    database: Option<Database>,
}

impl Service {
    pub fn local_addr(&self) -> Result<SocketAddr, StartupError> {
        let address = self.listener.local_addr().map_err(ServerError::Io)?;
        Ok(address)
    }

    /// Serve until `shutdown` fires, then close the database pool.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let result = self.server.run(self.listener, shutdown.subscribe()).await;

        if let Some(database) = self.database {
            database.close().await;
            tracing::info!("Database pool closed");
        }

        result.map_err(StartupError::from)
    }
}

/// Connect storage, build the server and bind its listener.
pub async fn bootstrap(config: &AppConfig, storage: Storage) -> Result<Service, StartupError> {
    tracing::info!(
        env = %config.env,
        storage = ?storage,
        database = ?config.database,
        http = ?config.http,
        "Starting user service"
    );

    let (users, database): (Arc<dyn UserStore>, Option<Database>) = match storage {
        Storage::Postgres => {
            let database = Database::connect(&config.database).await?;
            (Arc::new(PgUserStore::new(&database)), Some(database))
        }
        Storage::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            (Arc::new(MemoryUserStore::new()), None)
        }
    };

    let server = HttpServer::new(&config.http, users);

    let address = config.http.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    Ok(Service {
        server,
        listener,
        database,
    })
}

/// Start the Prometheus exporter when an address is configured.
pub fn start_metrics(config: &AppConfig) -> Result<(), StartupError> {
    if config.metrics_address.is_empty() {
        return Ok(());
    }

    let address: SocketAddr =
        config
            .metrics_address
            .parse()
            .map_err(|source| StartupError::MetricsAddress {
                address: config.metrics_address.clone(),
                source,
            })?;

    metrics::init_metrics(address)?;
    Ok(())
}

/// Message printed when the process cannot recover from `err`.
pub fn fatal_message(context: &str, err: &dyn Display) -> String {
    format!("{context}. err: {err}")
}

/// Unwrap `result` or print a fatal message and exit with status 1.
pub fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            let message = fatal_message(context, &err);
            tracing::error!("{message}");
            eprintln!("{message}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, HttpConfig};

    fn config() -> AppConfig {
        AppConfig {
            env: "test".into(),
            database: DatabaseConfig {
                name: "users".into(),
                user: "postgres".into(),
                password: "secret".into(),
                host: "127.0.0.1".into(),
                port: "1".into(),
                connection_retry: 1,
                ..Default::default()
            },
            http: HttpConfig {
                domain: "127.0.0.1".into(),
                port: "0".into(),
                shutdown_grace_period: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_fatal_message_format() {
        let message = fatal_message("Failed to create database", &"connection refused");
        assert_eq!(message, "Failed to create database. err: connection refused");
    }

    #[tokio::test]
    async fn test_unreachable_database_reports_attempts() {
        let err = bootstrap(&config(), Storage::Postgres).await.err().unwrap();

        assert!(matches!(err, StartupError::Database(DatabaseError::Ping(_))));
        let message = fatal_message("Failed to create database", &err);
        assert!(message.contains("1 attempt"), "{message}");
        assert!(message.to_lowercase().contains("connection refused"), "{message}");
    }

    #[tokio::test]
    async fn test_zero_retry_is_rejected_before_connecting() {
        let mut cfg = config();
        cfg.database.connection_retry = 0;

        let err = bootstrap(&cfg, Storage::Postgres).await.err().unwrap();

        assert!(matches!(
            err,
            StartupError::Database(DatabaseError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_service_runs_until_shutdown() {
        let service = bootstrap(&config(), Storage::Memory).await.unwrap();
        assert_ne!(service.local_addr().unwrap().port(), 0);

        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        let handle = tokio::spawn(async move { service.run(&shutdown).await });

        while trigger.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(trigger.trigger("test"));

        assert!(handle.await.unwrap().is_ok());
    }

    #[test]
    fn test_metrics_disabled_without_address() {
        assert!(start_metrics(&config()).is_ok());
    }

    #[test]
    fn test_bad_metrics_address() {
        let mut cfg = config();
        cfg.metrics_address = "not-an-address".into();

        let err = start_metrics(&cfg).unwrap_err();
        assert!(matches!(err, StartupError::MetricsAddress { .. }));
    }
}
