//! Writing the specification document to disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::assembler::SpecificationDocument;

/// Errors while writing the document.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The document could not be serialized.
    #[error("failed to serialize specification: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The parent directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Render the document as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`OutputError::Serialize`] if serialization fails.
pub fn render_specification(doc: &SpecificationDocument) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Write the document to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized or written.
pub fn write_specification(path: &Path, doc: &SpecificationDocument) -> Result<(), OutputError> {
    let content = render_specification(doc)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, content).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), paths = doc.paths.len(), "Specification written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::Assembler;
    use crate::types::RouteDocumentation;
    use tempfile::TempDir;

    #[test]
    fn test_writes_pretty_json_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docs/api/openapi.json");

        let mut assembler = Assembler::new();
        assembler.add(&RouteDocumentation {
            path: "/api/health".into(),
            description: String::new(),
            methods: [("GET".to_string(), crate::types::Operation::default())].into(),
        });
        write_specification(&path, &assembler.finish()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"openapi\": \"3.0.0\""));
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert!(value["paths"]["/api/health"]["get"].is_object());
    }

    #[test]
    fn test_write_into_file_parent_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = write_specification(&blocker.join("openapi.json"), &SpecificationDocument::default())
            .unwrap_err();
        assert!(matches!(err, OutputError::CreateDir { .. }));
    }
}
