//! User Service
//!
//! # Architecture Overview
//!
//! ```text
//!     .env / process environment
//!              │
//!              ▼
//!     ┌─────────────────┐     ┌──────────────────────┐
//!     │ config (binder, │────▶│ database (retried    │
//!     │   validation)   │     │  open + ping)        │
//!     └─────────────────┘     └──────────┬───────────┘
//!                                        │ UserStore
//!                                        ▼
//!     Client ───────────────▶ ┌──────────────────────┐
//!                             │ http (axum router,   │
//!     Client ◀─────────────── │  request id, trace)  │
//!                             └──────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use user_service::config::{load_config, LoadOptions, OptionalParse};
use user_service::lifecycle::startup::start_metrics;
use user_service::lifecycle::{bootstrap, or_exit, signals, Shutdown, StartupError, Storage};
use user_service::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "user-service", version, about = "User CRUD HTTP service")]
struct Cli {
    /// Env file to load before reading the environment (default: ./.env if present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Create the users table on startup
    #[arg(long)]
    migrate: bool,

    /// Serve from a process-local store instead of PostgreSQL
    #[arg(long)]
    in_memory: bool,

    /// Report every missing or malformed variable instead of the first
    #[arg(long)]
    collect_config_errors: bool,

    /// Zero unparsable optional variables instead of failing
    #[arg(long)]
    lenient_optional: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = LoadOptions {
        optional_parse: if cli.lenient_optional {
            OptionalParse::ZeroValue
        } else {
            OptionalParse::Reject
        },
        collect_all: cli.collect_config_errors,
    };
    let (mut config, env_file) = or_exit(
        load_config(cli.env_file.as_deref(), options),
        "Failed to load configuration",
    );
    if cli.migrate {
        config.database.run_migrations = true;
    }

    or_exit(
        logging::init(config.log_level()).map_err(StartupError::from),
        "Failed to initialize logging",
    );

    tracing::info!("user-service v{} starting", env!("CARGO_PKG_VERSION"));
    match env_file {
        Some(path) => tracing::info!(path = %path.display(), "Loaded env file"),
        None => tracing::info!("No .env file found, using process environment"),
    }

    or_exit(start_metrics(&config), "Failed to start metrics");

    let storage = if cli.in_memory {
        Storage::Memory
    } else {
        Storage::Postgres
    };
    let service = or_exit(bootstrap(&config, storage).await, "Failed to start service");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::listen(shutdown.clone()));

    service.run(&shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
