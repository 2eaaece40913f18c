//! Configuration loading from the environment.

use std::path::{Path, PathBuf};

use crate::config::binder::{BindError, EnvBinder, EnvSource, OptionalParse, ProcessEnv};
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("{0}")]
    Bind(#[from] BindError),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// How the loader binds values.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Treatment of unparsable optional values.
    pub optional_parse: OptionalParse,
    /// Report every missing or malformed variable instead of the first.
    pub collect_all: bool,
}

/// Bind and validate configuration from any source.
pub fn load_from<S: EnvSource>(source: S, options: LoadOptions) -> Result<AppConfig, ConfigError> {
    let binder = EnvBinder::new(source).optional_parse(options.optional_parse);
    let mut config = AppConfig::default();

    if options.collect_all {
        binder.bind_all(&mut config)?;
    } else {
        binder.bind(&mut config)?;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load an env file into the process environment.
///
/// An explicit `env_file` must exist; the implicit `./.env` is optional.
/// Returns the path that was loaded, if any.
pub fn load_env_file(env_file: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(e.into()),
        },
    }
}

/// Load `.env` (if any) into the process environment, then bind from it.
///
/// Nothing is logged here so callers can install a subscriber first; the
/// loaded env file path is returned alongside the config.
pub fn load_config(
    env_file: Option<&Path>,
    options: LoadOptions,
) -> Result<(AppConfig, Option<PathBuf>), ConfigError> {
    let loaded = load_env_file(env_file)?;
    let config = load_from(ProcessEnv, options)?;
    Ok((config, loaded))
}
