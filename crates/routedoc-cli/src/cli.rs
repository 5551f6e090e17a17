//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use routedoc_core::ConfigOverrides;

/// Convert Next.js API routes to an OpenAPI specification.
///
/// Scans the API directory for `route.{js,ts,jsx,tsx}` files and asks a local
/// Ollama model to document each one.
#[derive(Debug, Parser)]
#[command(name = "routedoc", version, about, long_about = None)]
pub struct Cli {
    /// Directory containing Next.js API routes [default: ./api]
    #[arg(short = 'd', long)]
    pub api_dir: Option<PathBuf>,

    /// Output file for the OpenAPI specification [default: openapi.json]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ollama model to use for documentation generation [default: llama3.1]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Number of routes documented concurrently [default: 3]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Ollama server URL [default: http://localhost:11434]
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Per-request timeout in seconds [default: 30]
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Extra attempts for timeouts, connection errors, and 5xx replies [default: 0]
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Stop starting new routes after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "ROUTEDOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write JSON logs to daily rolling files in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-friendly multi-line output.
    Pretty,
    /// One line per event.
    Compact,
    /// Structured JSON.
    Json,
}

impl Cli {
    /// Flags that take precedence over file and environment configuration.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_dir: self.api_dir.clone(),
            output: self.output.clone(),
            model: self.model.clone(),
            ollama_url: self.ollama_url.clone(),
            workers: self.workers,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            deadline_secs: self.deadline_secs,
        }
    }
}
