//! Recovery of route documentation from raw model text.
//!
//! Models wrap JSON in code fences, prepend chatter, or append explanations.
//! [`sanitize_reply`] strips that down to the outermost `{...}` span and
//! [`parse_reply`] decodes it.
//!
//! Limits: truncated JSON cannot be recovered, and prose that itself contains
//! braces before or after the object defeats the slicing. Braces inside
//! string values are harmless because only the outermost indices are used.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::trace;

use crate::types::RouteDocumentation;

/// A line holding only a code fence, optionally tagged (```` ```json ````).
/// Backticks inside string values are left alone.
static FENCE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[A-Za-z]*[ \t]*\r?$").expect("fence line pattern is valid")
});

/// A reply from which no route documentation could be recovered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplyError {
    /// The sanitized text is not a route documentation object.
    #[error("{reason}; reply text: {text}")]
    MalformedReply {
        /// Why decoding failed.
        reason: String,
        /// The sanitized text that failed to decode.
        text: String,
    },
}

impl ReplyError {
    /// The offending (sanitized) text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::MalformedReply { text, .. } => text,
        }
    }
}

/// Result type for reply parsing.
pub type ReplyResult<T> = std::result::Result<T, ReplyError>;

/// Strip code fence lines and surrounding prose from a raw reply.
///
/// A fence sharing a line with other text is not removed here; when it sits
/// outside the object, the brace slicing drops it.
///
/// If the text has an opening brace followed later by a closing brace, the
/// result is the span from the first `{` to the last `}` inclusive. Otherwise
/// the trimmed, fence-free text is returned unchanged.
#[must_use]
pub fn sanitize_reply(raw: &str) -> String {
    let text = FENCE_LINE.replace_all(raw, "");
    let text = text.trim();

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Decode a raw model reply into route documentation.
///
/// Method keys are returned exactly as the model wrote them.
///
/// # Errors
///
/// Returns [`ReplyError::MalformedReply`] if the sanitized text is not a
/// JSON object with a non-blank `path`.
pub fn parse_reply(raw: &str) -> ReplyResult<RouteDocumentation> {
    trace!(reply = raw, "Raw model reply");
    let cleaned = sanitize_reply(raw);
    trace!(reply = %cleaned, "Sanitized model reply");

    let doc: RouteDocumentation =
        serde_json::from_str(&cleaned).map_err(|e| ReplyError::MalformedReply {
            reason: e.to_string(),
            text: cleaned.clone(),
        })?;

    if doc.path.trim().is_empty() {
        return Err(ReplyError::MalformedReply {
            reason: "route path is empty".to_string(),
            text: cleaned,
        });
    }

    Ok(doc)
}
