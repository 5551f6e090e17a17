//! # routedoc-core
//!
//! Turns a directory of Next.js route handlers into an OpenAPI document by
//! asking a locally hosted LLM what each handler does.
//!
//! This crate provides:
//! - Route handler discovery (`route.{js,ts,jsx,tsx}`)
//! - Prompt composition and the generation service client
//! - Defensive recovery of JSON from model replies
//! - Assembly of per-route results into one specification document
//!
//! ## Architecture
//!
//! The crate is organized into the following modules, leaf-first:
//!
//! - [`discovery`] - Walks the API directory and reads route files
//! - [`prompt`] - Builds the per-route prompt
//! - [`generation`] - `Generator` capability and the Ollama HTTP client
//! - [`reply`] - Sanitizes and parses model replies
//! - [`assembler`] - Folds route documentation into the output document
//! - [`pipeline`] - Drives units through the stages above and reports results
//! - [`output`] - Writes the document to disk
//! - [`config`] - Layered run configuration
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Route units and decoded route documentation

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod assembler;
pub mod config;
pub mod discovery;
pub mod error;
pub mod generation;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod reply;
pub mod types;

// Re-export primary types for convenience
pub use assembler::{Assembler, SpecificationDocument};
pub use config::{Config, ConfigError, ConfigOverrides, ConfigResult};
pub use discovery::{discover_routes, DiscoveryError, RouteDiscoverer};
pub use error::{Result, RoutedocError};
pub use generation::{GenerationError, Generator, OllamaClient};
pub use output::{render_specification, write_specification, OutputError};
pub use pipeline::{
    run_with_config, FailureKind, Pipeline, PipelineOptions, RouteError, RouteFailure, RunOutcome,
    RunReport, RunSummary, DEFAULT_WORKERS,
};
pub use prompt::compose_prompt;
pub use reply::{parse_reply, sanitize_reply, ReplyError};
pub use types::{Operation, Parameter, ParameterLocation, RouteDocumentation, RouteFileKind, RouteUnit};
