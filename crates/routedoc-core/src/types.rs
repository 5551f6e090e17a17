//! Shared types for route units and the documentation the model returns.
//!
//! These types describe one route's trip through the pipeline. The assembled
//! output document lives in [`crate::assembler`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

/// The four recognized route handler file kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteFileKind {
    /// `route.js`
    Js,
    /// `route.jsx`
    Jsx,
    /// `route.ts`
    Ts,
    /// `route.tsx`
    Tsx,
}

impl RouteFileKind {
    /// Every recognized kind, in extension order.
    pub const ALL: [Self; 4] = [Self::Js, Self::Ts, Self::Jsx, Self::Tsx];

    /// The file extension for this kind, without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Jsx => "jsx",
            Self::Ts => "ts",
            Self::Tsx => "tsx",
        }
    }

    /// Match a base file name against the route handler naming convention.
    ///
    /// The match is exact and case-sensitive: `route.ts` is recognized,
    /// `Route.ts` and `route.test.ts` are not.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.strip_prefix("route.")?;
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }
}

impl fmt::Display for RouteFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One discovered route handler file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUnit {
    /// Path of the file as found during the walk.
    pub file_path: PathBuf,

    /// Path of the file below the discovery root. Dynamic segments are read
    /// from this, never from directories above the root.
    pub route_path: PathBuf,

    /// Which of the recognized file names matched.
    pub kind: RouteFileKind,

    /// Full source text.
    pub content: String,
}

impl RouteUnit {
    /// Create a new route unit.
    ///
    /// The route path starts out equal to the file path; see
    /// [`RouteUnit::relative_to`].
    pub fn new(file_path: impl Into<PathBuf>, kind: RouteFileKind, content: impl Into<String>) -> Self {
        let file_path = file_path.into();
        Self {
            route_path: file_path.clone(),
            file_path,
            kind,
            content: content.into(),
        }
    }

    /// Set the route path to the file path relative to `root`.
    ///
    /// Leaves the route path unchanged if the file is not below `root`.
    #[must_use]
    pub fn relative_to(mut self, root: &Path) -> Self {
        if let Ok(relative) = self.file_path.strip_prefix(root) {
            self.route_path = relative.to_path_buf();
        }
        self
    }

    /// The file path, for display and error reporting.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// The first `max_chars` characters of the content.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }
}

/// Documentation for one route as decoded from a model reply.
///
/// Method keys are kept exactly as the model wrote them. Lower-casing happens
/// when the record is assembled into the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDocumentation {
    /// Path template, e.g. `/api/users/{id}`.
    pub path: String,

    /// Free-text description of the route.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,

    /// HTTP method name to operation.
    #[serde(default, deserialize_with = "nullable")]
    pub methods: BTreeMap<String, Operation>,
}

/// One documented HTTP operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Short summary.
    #[serde(default, deserialize_with = "nullable")]
    pub summary: String,

    /// Longer description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,

    /// Parameters in the order the model listed them.
    #[serde(default, deserialize_with = "nullable")]
    pub parameters: Vec<Parameter>,
}

/// One operation parameter as the model describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    /// Declared type, e.g. `string` or `integer`.
    #[serde(
        rename = "type",
        default = "default_parameter_type",
        deserialize_with = "parameter_type"
    )]
    pub param_type: String,

    /// Where the parameter is carried.
    #[serde(rename = "in", default, deserialize_with = "nullable")]
    pub location: ParameterLocation,

    /// Whether the parameter is required.
    #[serde(default, deserialize_with = "nullable")]
    pub required: bool,
}

fn default_parameter_type() -> String {
    "string".to_string()
}

fn parameter_type<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(default_parameter_type))
}

/// Treat an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where a parameter lives in the request.
///
/// Parsing is case-insensitive. Unrecognized values are kept verbatim so that
/// an odd location never fails a whole route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParameterLocation {
    /// Path segment.
    Path,
    /// Query string.
    #[default]
    Query,
    /// Request body.
    Body,
    /// Request header.
    Header,
    /// Cookie.
    Cookie,
    /// Anything else the model came up with.
    Other(String),
}

impl ParameterLocation {
    /// The wire name of this location.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ParameterLocation {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "path" => Self::Path,
            "query" => Self::Query,
            "body" => Self::Body,
            "header" => Self::Header,
            "cookie" => Self::Cookie,
            _ => Self::Other(value),
        }
    }
}

impl From<ParameterLocation> for String {
    fn from(value: ParameterLocation) -> Self {
        match value {
            ParameterLocation::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
