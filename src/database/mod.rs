//! Database bootstrap and data access.
//!
//! # Data Flow
//! ```text
//! DatabaseConfig
//!     → RetryPolicy (DATABASE_CONNECTION_RETRY, backoff, deadline)
//!     → open: build a lazy pool, no I/O (retried, 100ms fixed delay)
//!     → ping: one fresh connection + ping per attempt (retried, 500ms fixed delay)
//!     → optional migration
//!     → Database (pool shared by every request)
//! ```
//!
//! # Design Decisions
//! - `connect` never panics; the entry point decides whether failure is fatal
//! - Open and ping get separate attempt budgets from the same config
//! - Each ping attempt is exactly one connection; the pool's own
//!   reconnect loop never runs during bootstrap
//! - Pool is closed again when ping exhausts its budget

pub mod users;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Connection, PgConnection};

use crate::config::DatabaseConfig;
use crate::resilience::{InvalidConfiguration, RetryError, RetryPolicy, WaitStrategy};

pub use users::{MemoryUserStore, NewUser, PgUserStore, User, UserStore};

/// Fixed pause between open attempts when backoff is disabled.
pub const OPEN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Fixed pause between ping attempts when backoff is disabled.
pub const PING_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Per-attempt bound on acquiring a connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS "users" (
    "id" BIGSERIAL PRIMARY KEY,
    "first_name" TEXT NOT NULL,
    "last_name" TEXT NOT NULL,
    "role" TEXT NOT NULL,
    "user_id" BIGINT NOT NULL
)
"#;

/// Bootstrap and query failures.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    InvalidConfiguration(#[from] InvalidConfiguration),

    #[error("failed to connect to database: {0}")]
    Open(RetryError<sqlx::Error>),

    #[error("failed to ping database: {0}")]
    Ping(RetryError<sqlx::Error>),

    #[error("failed to run migrations: {0}")]
    Migrate(#[source] sqlx::Error),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Attempts spent before a bootstrap phase gave up.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            DatabaseError::Open(e) | DatabaseError::Ping(e) => Some(e.attempts()),
            _ => None,
        }
    }
}

/// Retry policy described by the database configuration.
///
/// `fixed_delay` applies when backoff is disabled.
pub fn retry_policy(
    config: &DatabaseConfig,
    fixed_delay: Duration,
) -> Result<RetryPolicy, InvalidConfiguration> {
    let wait = if config.retry_backoff {
        WaitStrategy::exponential()
    } else {
        WaitStrategy::Fixed(fixed_delay)
    };

    let policy = RetryPolicy::new(config.connection_retry, wait)?;
    Ok(match config.retry_deadline() {
        Some(deadline) => policy.with_deadline(deadline),
        None => policy,
    })
}

/// Connection options for the configured server.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name);

    if let Ok(port) = config.port.parse::<u16>() {
        options = options.port(port);
    }

    options
}

/// A live connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

/// One connection, one ping, then close.
async fn ping_once(options: &PgConnectOptions) -> Result<(), sqlx::Error> {
    let mut conn = PgConnection::connect_with(options).await?;
    conn.ping().await?;
    conn.close().await
}

/// Ping under `policy`; closes `pool` when the budget runs out.
async fn ping_until_ready(
    pool: &PgPool,
    options: &PgConnectOptions,
    policy: &RetryPolicy,
) -> Result<u32, DatabaseError> {
    let mut attempts = 0;
    let pinged = policy
        .run("database_ping", || {
            attempts += 1;
            ping_once(options)
        })
        .await;

    match pinged {
        Ok(()) => Ok(attempts),
        Err(err) => {
            pool.close().await;
            Err(DatabaseError::Ping(err))
        }
    }
}

impl Database {
    /// Open the pool and ping the server, retrying each step under the configured policy.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let open_policy = retry_policy(config, OPEN_RETRY_DELAY)?;
        let ping_policy = retry_policy(config, PING_RETRY_DELAY)?;
        let options = connect_options(config);
        let pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections())
            .acquire_timeout(ACQUIRE_TIMEOUT);

        tracing::info!(
            host = %config.host,
            port = %config.port,
            database = %config.name,
            max_attempts = open_policy.max_attempts(),
            "Attempting to connect to database"
        );

        let mut open_attempts = 0;
        let pool = open_policy
            .run("database_open", || {
                open_attempts += 1;
                let pool = pool_options.clone().connect_lazy_with(options.clone());
                async move { Ok::<_, sqlx::Error>(pool) }
            })
            .await
            .map_err(DatabaseError::Open)?;

        tracing::info!(attempts = open_attempts, "Database pool opened");

        let ping_attempts = ping_until_ready(&pool, &options, &ping_policy).await?;
        tracing::info!(attempts = ping_attempts, "Database connection established");

        let database = Self { pool };
        if config.run_migrations {
            database.migrate().await?;
        }

        Ok(database)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Migrate)?;
        tracing::info!("Database migration successful");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
