//! Client for the text generation service.
//!
//! The pipeline only needs one capability from the model host: turn a prompt
//! into text. [`Generator`] captures that, and [`OllamaClient`] implements it
//! against Ollama's `POST /api/generate` endpoint with streaming disabled.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout for one generation call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from a single generation call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// No reply arrived within the request timeout.
    #[error("request timed out after {timeout_secs} seconds")]
    TransportTimeout {
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// The request could not be delivered (connection refused, DNS, TLS).
    #[error("service unreachable: {message}")]
    Unreachable {
        /// Transport error description.
        message: String,
    },

    /// The service answered with a non-success HTTP status.
    #[error("service returned status {status}")]
    ServiceError {
        /// HTTP status code.
        status: u16,
    },

    /// The body could not be decoded as a reply envelope.
    #[error("invalid reply envelope: {message}")]
    ProtocolError {
        /// Decoder error description.
        message: String,
    },
}

impl GenerationError {
    /// Returns `true` if repeating the same request might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::TransportTimeout { .. } | Self::Unreachable { .. } => true,
            Self::ServiceError { status } => *status >= 500,
            Self::ProtocolError { .. } => false,
        }
    }
}

/// Result type for generation calls.
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Something that turns a prompt into model text.
///
/// Implementations own their transport, timeout, and error mapping. They do
/// not retry; retry policy belongs to the caller.
pub trait Generator: Send + Sync {
    /// Generate a complete (non-streamed) reply for `prompt`.
    fn generate(&self, prompt: &str) -> impl Future<Output = GenerationResult<String>> + Send;
}

/// Request body for `POST /api/generate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Model identifier, e.g. `llama3.1`.
    pub model: String,
    /// Full prompt text.
    pub prompt: String,
    /// Always `false`: one complete reply is required.
    pub stream: bool,
}

/// Reply envelope from `POST /api/generate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Generated text.
    pub response: String,
    /// Whether generation finished.
    #[serde(default)]
    pub done: bool,
}

/// HTTP client for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the server at `base_url` using `model`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Unreachable`] if the URL cannot be parsed or
    /// the HTTP client cannot be built.
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> GenerationResult<Self> {
        let endpoint = generate_endpoint(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Unreachable {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            timeout,
        })
    }

    /// The full URL generation requests are sent to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The model identifier sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::TransportTimeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            GenerationError::Unreachable {
                message: err.to_string(),
            }
        }
    }
}

impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> GenerationResult<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, prompt_len = prompt.len(), "Sending generation request");

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GenerationError::ServiceError {
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(|e| self.map_transport_error(&e))?;
        let envelope: GenerateResponse =
            serde_json::from_slice(&body).map_err(|e| GenerationError::ProtocolError {
                message: e.to_string(),
            })?;

        if !envelope.done {
            warn!(model = %self.model, "Generation service reported an incomplete reply");
        }

        Ok(envelope.response)
    }
}

/// Build `{base}/api/generate`, keeping any path prefix on the base URL.
fn generate_endpoint(base_url: &str) -> GenerationResult<Url> {
    let trimmed = base_url.trim().trim_end_matches('/');
    Url::parse(&format!("{trimmed}/api/generate")).map_err(|e| GenerationError::Unreachable {
        message: format!("invalid service URL '{base_url}': {e}"),
    })
}
