//! Route handler discovery.
//!
//! Walks an API root directory and collects every `route.{js,ts,jsx,tsx}`
//! file as a [`RouteUnit`]. Unreadable entries are skipped so that one bad
//! file never costs the rest of the walk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::types::{RouteFileKind, RouteUnit};

/// Number of content characters included in discovery debug logs.
const PREVIEW_CHARS: usize = 50;

/// Errors that prevent the walk from starting.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The root path does not exist.
    #[error("API directory not found: {}", path.display())]
    RootNotFound {
        /// Requested root.
        path: PathBuf,
    },

    /// The root path exists but is not a directory.
    #[error("API directory is not a directory: {}", path.display())]
    RootNotADirectory {
        /// Requested root.
        path: PathBuf,
    },

    /// The root path could not be inspected.
    #[error("Cannot read API directory {}: {source}", path.display())]
    RootUnreadable {
        /// Requested root.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for discovery.
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

/// Discovers route handler files below a root directory.
#[derive(Debug, Clone)]
pub struct RouteDiscoverer {
    root: PathBuf,
}

impl RouteDiscoverer {
    /// Create a discoverer for the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory this discoverer walks.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and return every route handler file found.
    ///
    /// Units come back in traversal order, which is not guaranteed to be
    /// stable across platforms.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root itself is missing, not a directory,
    /// or cannot be inspected. Failures below the root are skipped.
    pub fn discover(&self) -> DiscoveryResult<Vec<RouteUnit>> {
        self.check_root()?;

        let mut units = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(kind) = entry.file_name().to_str().and_then(RouteFileKind::from_file_name)
            else {
                continue;
            };

            match std::fs::read_to_string(entry.path()) {
                Ok(content) => {
                    let unit = RouteUnit::new(entry.path(), kind, content).relative_to(&self.root);
                    debug!(
                        path = %unit.file_path.display(),
                        kind = %unit.kind,
                        preview = unit.preview(PREVIEW_CHARS),
                        "Discovered route file"
                    );
                    units.push(unit);
                }
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Skipping unreadable route file");
                }
            }
        }

        info!(root = %self.root.display(), count = units.len(), "Route discovery complete");
        Ok(units)
    }

    fn check_root(&self) -> DiscoveryResult<()> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(DiscoveryError::RootNotADirectory {
                path: self.root.clone(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DiscoveryError::RootNotFound {
                path: self.root.clone(),
            }),
            Err(source) => Err(DiscoveryError::RootUnreadable {
                path: self.root.clone(),
                source,
            }),
        }
    }
}

/// Convenience wrapper around [`RouteDiscoverer::discover`].
///
/// # Errors
///
/// See [`RouteDiscoverer::discover`].
pub fn discover_routes(root: impl Into<PathBuf>) -> DiscoveryResult<Vec<RouteUnit>> {
    RouteDiscoverer::new(root).discover()
}
