//! Unified error type for runs that stop.
//!
//! Each module has its own error type (`DiscoveryError`, `GenerationError`,
//! `ConfigError`, `OutputError`). [`RoutedocError`] gathers the ones that end
//! a run, and carries a stable [`error_code`](RoutedocError::error_code) for the
//! final report.
//!
//! Per-route failures (generation and reply errors) never appear here: the
//! pipeline records them as [`RouteFailure`](crate::pipeline::RouteFailure)
//! values and keeps going.
//!
//! # Example
//!
//! ```rust
//! use routedoc_core::error::{RoutedocError, Result};
//! use std::path::PathBuf;
//!
//! fn check_root(path: &PathBuf) -> Result<()> {
//!     if !path.exists() {
//!         return Err(RoutedocError::RootNotFound(path.clone()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a routedoc run.
#[derive(Debug, Error)]
pub enum RoutedocError {
    // =========================================================================
    // DISCOVERY ERRORS
    // =========================================================================
    /// The API root directory does not exist.
    #[error("API directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The API root exists but is not a directory.
    #[error("API directory is not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),

    /// The walk could not start for another reason (permissions, I/O).
    #[error("Route discovery failed: {0}")]
    DiscoveryFailed(String),

    // =========================================================================
    // GENERATION CLIENT ERRORS
    // =========================================================================
    /// The generation client could not be built from the configured URL.
    #[error("Cannot set up generation client: {0}")]
    ClientSetup(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// Configuration sources could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    ConfigParseError(String),

    /// Configuration was loaded but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // OUTPUT ERRORS
    // =========================================================================
    /// The specification document could not be written.
    #[error("Output error: {0}")]
    OutputError(String),

    // =========================================================================
    // RUN OUTCOME
    // =========================================================================
    /// Routes were discovered but none could be documented.
    #[error("None of the {discovered} discovered routes could be documented")]
    NothingDocumented {
        /// Number of routes discovered.
        discovered: usize,
    },
}

/// A specialized [`Result`] type for routedoc operations.
pub type Result<T> = std::result::Result<T, RoutedocError>;

impl RoutedocError {
    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RootNotFound(_) => "ROOT_NOT_FOUND",
            Self::RootNotADirectory(_) => "ROOT_NOT_A_DIRECTORY",
            Self::DiscoveryFailed(_) => "DISCOVERY_FAILED",
            Self::ClientSetup(_) => "CLIENT_SETUP",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::OutputError(_) => "OUTPUT_ERROR",
            Self::NothingDocumented { .. } => "NOTHING_DOCUMENTED",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::discovery::DiscoveryError> for RoutedocError {
    fn from(err: crate::discovery::DiscoveryError) -> Self {
        use crate::discovery::DiscoveryError;
        match err {
            DiscoveryError::RootNotFound { path } => Self::RootNotFound(path),
            DiscoveryError::RootNotADirectory { path } => Self::RootNotADirectory(path),
            DiscoveryError::RootUnreadable { path, source } => {
                Self::DiscoveryFailed(format!("Cannot read {}: {}", path.display(), source))
            }
        }
    }
}

impl From<crate::generation::GenerationError> for RoutedocError {
    fn from(err: crate::generation::GenerationError) -> Self {
        Self::ClientSetup(err.to_string())
    }
}

impl From<crate::config::ConfigError> for RoutedocError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::Load(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::output::OutputError> for RoutedocError {
    fn from(err: crate::output::OutputError) -> Self {
        Self::OutputError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigError};
    use crate::discovery::DiscoveryError;
    use crate::generation::GenerationError;
    use crate::output::OutputError;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RoutedocError::RootNotFound(PathBuf::new()).error_code(),
            "ROOT_NOT_FOUND"
        );
        assert_eq!(
            RoutedocError::NothingDocumented { discovered: 3 }.error_code(),
            "NOTHING_DOCUMENTED"
        );
        assert_eq!(
            RoutedocError::OutputError("disk full".into()).error_code(),
            "OUTPUT_ERROR"
        );
    }

    #[test]
    fn test_from_discovery_error() {
        let err: RoutedocError = DiscoveryError::RootNotFound {
            path: PathBuf::from("/nope"),
        }
        .into();
        assert!(matches!(err, RoutedocError::RootNotFound(ref p) if p == &PathBuf::from("/nope")));

        let err: RoutedocError = DiscoveryError::RootUnreadable {
            path: PathBuf::from("/locked"),
            source: IoErr::new(ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert_eq!(err.error_code(), "DISCOVERY_FAILED");
        assert!(err.to_string().contains("/locked"));
    }

    #[test]
    fn test_from_generation_error_is_client_setup() {
        let err: RoutedocError = GenerationError::Unreachable {
            message: "invalid service URL".into(),
        }
        .into();
        assert_eq!(err.error_code(), "CLIENT_SETUP");
        assert!(err.to_string().contains("invalid service URL"));
    }

    #[test]
    fn test_from_config_validation_errors() {
        let config = Config {
            workers: 0,
            timeout_secs: 0,
            ..Config::default()
        };
        let err: RoutedocError = config.validate().unwrap_err().into();
        assert_eq!(err.error_code(), "CONFIG_VALIDATION_ERROR");
        let message = err.to_string();
        assert!(message.contains("workers"));
        assert!(message.contains("timeout_secs"));

        let single: RoutedocError = ConfigError::ValidationError {
            field: "model",
            message: "must not be empty".into(),
        }
        .into();
        assert!(single.to_string().contains("model: must not be empty"));
    }

    #[test]
    fn test_from_output_error() {
        let err: RoutedocError = OutputError::Write {
            path: PathBuf::from("/ro/openapi.json"),
            source: IoErr::new(ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert_eq!(err.error_code(), "OUTPUT_ERROR");
        assert!(err.to_string().contains("/ro/openapi.json"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RoutedocError>();
        assert_sync::<RoutedocError>();
    }
}
