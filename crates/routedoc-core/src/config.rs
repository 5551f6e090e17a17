//! Run configuration.
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: the one passed explicitly, otherwise `./routedoc.toml`
//!    and then `<user config dir>/routedoc/config.toml` if they exist
//! 3. `ROUTEDOC_*` environment variables (e.g. `ROUTEDOC_MODEL`)
//! 4. Explicit overrides, normally command-line flags

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ROUTEDOC";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "routedoc.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// A single field failed validation.
    #[error("{field}: {message}")]
    ValidationError {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields failed validation.
    #[error("{} configuration problems: {}", .0.len(), .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing the API route handlers.
    pub api_dir: PathBuf,

    /// Where the specification document is written.
    pub output: PathBuf,

    /// Model identifier passed to the generation service.
    pub model: String,

    /// Base URL of the generation service.
    pub ollama_url: String,

    /// Maximum number of generation calls in flight.
    pub workers: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Extra attempts for retryable generation failures.
    pub max_retries: u32,

    /// Pause between retry attempts in milliseconds.
    pub retry_backoff_ms: u64,

    /// Stop starting new routes after this many seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_dir: PathBuf::from("./api"),
            output: PathBuf::from("openapi.json"),
            model: "llama3.1".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            workers: crate::pipeline::DEFAULT_WORKERS,
            timeout_secs: crate::generation::DEFAULT_TIMEOUT_SECS,
            max_retries: 0,
            retry_backoff_ms: 1000,
            deadline_secs: None,
        }
    }
}

/// Values that take precedence over every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// See [`Config::api_dir`].
    pub api_dir: Option<PathBuf>,
    /// See [`Config::output`].
    pub output: Option<PathBuf>,
    /// See [`Config::model`].
    pub model: Option<String>,
    /// See [`Config::ollama_url`].
    pub ollama_url: Option<String>,
    /// See [`Config::workers`].
    pub workers: Option<usize>,
    /// See [`Config::timeout_secs`].
    pub timeout_secs: Option<u64>,
    /// See [`Config::max_retries`].
    pub max_retries: Option<u32>,
    /// See [`Config::deadline_secs`].
    pub deadline_secs: Option<u64>,
}

impl Config {
    /// Load configuration from all sources and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing, any source
    /// fails to parse, or the merged values are invalid.
    pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> ConfigResult<Self> {
        Self::load_with_env(file, overrides, None)
    }

    /// Like [`Config::load`], reading environment variables from `env`
    /// instead of the process environment when given.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with_env(
        file: Option<&Path>,
        overrides: &ConfigOverrides,
        env: Option<HashMap<String, String>>,
    ) -> ConfigResult<Self> {
        let mut builder = ::config::Config::builder();

        match file {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                builder = builder.add_source(::config::File::from(path).required(true));
            }
            None => {
                for path in default_config_files() {
                    builder = builder.add_source(::config::File::from(path).required(false));
                }
            }
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides on top of the current values.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(api_dir) = &overrides.api_dir {
            self.api_dir.clone_from(api_dir);
        }
        if let Some(output) = &overrides.output {
            self.output.clone_from(output);
        }
        if let Some(model) = &overrides.model {
            self.model.clone_from(model);
        }
        if let Some(url) = &overrides.ollama_url {
            self.ollama_url.clone_from(url);
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = overrides.max_retries {
            self.max_retries = retries;
        }
        if overrides.deadline_secs.is_some() {
            self.deadline_secs = overrides.deadline_secs;
        }
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or, when several
    /// fields are wrong, [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.workers == 0 {
            errors.push(ConfigError::ValidationError {
                field: "workers",
                message: "must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            errors.push(ConfigError::ValidationError {
                field: "timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            errors.push(ConfigError::ValidationError {
                field: "model",
                message: "must not be empty".to_string(),
            });
        }
        match Url::parse(&self.ollama_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ConfigError::ValidationError {
                field: "ollama_url",
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ConfigError::ValidationError {
                field: "ollama_url",
                message: format!("'{}' is not a valid URL: {e}", self.ollama_url),
            }),
        }
        if self.deadline_secs == Some(0) {
            errors.push(ConfigError::ValidationError {
                field: "deadline_secs",
                message: "must be at least 1 when set".to_string(),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pause between retries.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Overall run deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

/// Config files consulted when none is given explicitly, lowest priority first.
fn default_config_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(dirs) = directories::ProjectDirs::from("", "", "routedoc") {
        files.push(dirs.config_dir().join("config.toml"));
    }
    files.push(PathBuf::from(LOCAL_CONFIG_FILE));
    files
}
