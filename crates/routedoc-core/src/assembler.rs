//! Assembly of per-route documentation into one OpenAPI document.
//!
//! The [`Assembler`] is the only stateful stage of the pipeline. It owns the
//! growing [`SpecificationDocument`] and is fed one [`RouteDocumentation`] at a
//! time by a single consumer.
//!
//! Collision policy: a path documented twice is replaced whole by the later
//! record. Methods are never merged across records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Parameter, RouteDocumentation};

/// OpenAPI version written into every document.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// Title written into the `info` block.
pub const DOCUMENT_TITLE: &str = "Next.js API Documentation";

/// Version written into the `info` block.
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// The assembled output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificationDocument {
    /// Always [`OPENAPI_VERSION`].
    pub openapi: String,
    /// Fixed info block.
    pub info: Info,
    /// Path template to lowercase method to operation.
    pub paths: BTreeMap<String, PathItem>,
}

impl Default for SpecificationDocument {
    fn default() -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info::default(),
            paths: BTreeMap::new(),
        }
    }
}

impl SpecificationDocument {
    /// Number of documented (path, method) pairs.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(BTreeMap::len).sum()
    }
}

/// The document `info` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// Product title.
    pub title: String,
    /// Document version.
    pub version: String,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: DOCUMENT_TITLE.to_string(),
            version: DOCUMENT_VERSION.to_string(),
        }
    }
}

/// Lowercase method name to rendered operation.
pub type PathItem = BTreeMap<String, RenderedOperation>;

/// An operation as written to the output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedOperation {
    /// Short summary.
    pub summary: String,
    /// Longer description.
    pub description: String,
    /// Parameters in model order.
    pub parameters: Vec<RenderedParameter>,
    /// Always the standard `200`/`400`/`500` placeholders.
    pub responses: BTreeMap<String, Response>,
}

/// A parameter as written to the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedParameter {
    /// Parameter name.
    pub name: String,
    /// Location (`path`, `query`, ...).
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required.
    pub required: bool,
    /// Type descriptor.
    pub schema: TypeSchema,
}

impl From<&Parameter> for RenderedParameter {
    fn from(param: &Parameter) -> Self {
        Self {
            name: param.name.clone(),
            location: param.location.as_str().to_string(),
            required: param.required,
            schema: TypeSchema {
                schema_type: param.param_type.clone(),
            },
        }
    }
}

/// A `{ "type": ... }` schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSchema {
    /// JSON schema type name.
    #[serde(rename = "type")]
    pub schema_type: String,
}

/// A response placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Human-readable description.
    pub description: String,
    /// Media type to content.
    pub content: BTreeMap<String, MediaType>,
}

/// A media type entry holding a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Body schema.
    pub schema: serde_json::Value,
}

impl Response {
    fn json(description: &str, schema: serde_json::Value) -> Self {
        Self {
            description: description.to_string(),
            content: BTreeMap::from([("application/json".to_string(), MediaType { schema })]),
        }
    }
}

/// The `200`, `400` and `500` responses attached to every operation.
#[must_use]
pub fn standard_responses() -> BTreeMap<String, Response> {
    let error_schema = serde_json::json!({
        "type": "object",
        "properties": {
            "error": { "type": "string" }
        }
    });

    BTreeMap::from([
        (
            "200".to_string(),
            Response::json(
                "Successful response",
                serde_json::json!({
                    "type": "object",
                    "description": "Response data"
                }),
            ),
        ),
        (
            "400".to_string(),
            Response::json("Bad request", error_schema.clone()),
        ),
        (
            "500".to_string(),
            Response::json("Internal server error", error_schema),
        ),
    ])
}

/// Render one route's methods into a path item.
///
/// Method keys are lower-cased. If two keys collide after lower-casing, the
/// one that sorts last in the source map wins.
#[must_use]
pub fn render_path_item(doc: &RouteDocumentation) -> PathItem {
    doc.methods
        .iter()
        .map(|(method, op)| {
            let rendered = RenderedOperation {
                summary: op.summary.clone(),
                description: op.description.clone(),
                parameters: op.parameters.iter().map(RenderedParameter::from).collect(),
                responses: standard_responses(),
            };
            (method.to_lowercase(), rendered)
        })
        .collect()
}

/// Folds route documentation into a [`SpecificationDocument`].
#[derive(Debug, Default)]
pub struct Assembler {
    document: SpecificationDocument,
}

impl Assembler {
    /// Create an assembler holding an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one route's documentation.
    ///
    /// Returns `true` if an earlier entry for the same path was replaced.
    pub fn add(&mut self, doc: &RouteDocumentation) -> bool {
        let item = render_path_item(doc);
        debug!(path = %doc.path, methods = item.len(), "Assembling path");

        let replaced = self.document.paths.insert(doc.path.clone(), item).is_some();
        if replaced {
            warn!(path = %doc.path, "Path documented more than once; keeping the latest");
        }
        replaced
    }

    /// Number of paths assembled so far.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.document.paths.len()
    }

    /// Read-only view of the document under construction.
    #[must_use]
    pub const fn document(&self) -> &SpecificationDocument {
        &self.document
    }

    /// Hand the finished document to the caller.
    #[must_use]
    pub fn finish(self) -> SpecificationDocument {
        self.document
    }
}
