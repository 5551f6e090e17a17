//! # routedoc
//!
//! Generates an OpenAPI specification from a Next.js API directory using a
//! local Ollama model.
//!
//! ## Running
//!
//! ```bash
//! # Document ./api with the default model
//! routedoc
//!
//! # Custom directory, output and model
//! routedoc -d app/api -o docs/openapi.json -m qwen2.5-coder --workers 1
//! ```
//!
//! Exit status is non-zero if discovery fails, the configuration is invalid,
//! the document cannot be written, or routes were found but none could be
//! documented. In the last case the (empty) document is still written.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::Path;

use clap::Parser;
use routedoc_core::{run_with_config, Config, RunOutcome, RunSummary};
use tracing::{error, info};

mod cli;
mod logging;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(cli.log_format, cli.log_dir.as_deref())?;

    if let Err(err) = run(&cli).await {
        error!(code = err.error_code(), error = %err, "Conversion failed");
        return Err(err.into());
    }

    Ok(())
}

async fn run(cli: &Cli) -> routedoc_core::Result<()> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides())?;

    info!(
        api_dir = %config.api_dir.display(),
        output = %config.output.display(),
        model = %config.model,
        ollama_url = %config.ollama_url,
        workers = config.workers,
        "Starting Next.js to OpenAPI conversion"
    );

    let outcome = run_with_config(&config).await?;
    if let RunOutcome::Written { report, output } = &outcome {
        print_summary(output, &report.summary, report.document.paths.len());
    }

    outcome.run_error().map_or(Ok(()), Err)
}

fn print_summary(output: &Path, summary: &RunSummary, documented_paths: usize) {
    println!("OpenAPI specification written to: {}", output.display());
    println!(
        "Routes: {} discovered, {} documented, {} failed, {} skipped",
        summary.discovered, summary.succeeded, summary.failed, summary.skipped
    );
    println!("File contains {documented_paths} documented endpoints");

    for failure in &summary.failures {
        println!("  failed [{}] {}", failure.kind, failure.file_path.display());
    }
}
