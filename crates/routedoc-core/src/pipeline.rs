//! The route-to-specification pipeline.
//!
//! For each discovered unit: compose a prompt, call the generator, parse the
//! reply. Up to `workers` units are in flight at once; their results are
//! drained by one consumer that owns the [`Assembler`], so the document has a
//! single writer.
//!
//! With one worker the run is sequential and paths that collide resolve in
//! discovery order. With more workers they resolve by completion order, which
//! is not deterministic.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::assembler::{Assembler, SpecificationDocument};
use crate::config::Config;
use crate::discovery::RouteDiscoverer;
use crate::error::{Result, RoutedocError};
use crate::generation::{GenerationError, Generator, OllamaClient};
use crate::output::write_specification;
use crate::prompt::compose_prompt;
use crate::reply::{parse_reply, ReplyError};
use crate::types::{RouteDocumentation, RouteUnit};

/// Why a single route could not be documented.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    /// The generation call failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The reply could not be parsed.
    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl RouteError {
    /// The failure category for reporting.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Generation(GenerationError::TransportTimeout { .. }) => {
                FailureKind::TransportTimeout
            }
            Self::Generation(GenerationError::Unreachable { .. }) => FailureKind::Unreachable,
            Self::Generation(GenerationError::ServiceError { .. }) => FailureKind::ServiceError,
            Self::Generation(GenerationError::ProtocolError { .. }) => FailureKind::ProtocolError,
            Self::Reply(ReplyError::MalformedReply { .. }) => FailureKind::MalformedReply,
        }
    }
}

/// Per-route failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Generation call timed out.
    TransportTimeout,
    /// Generation service could not be reached.
    Unreachable,
    /// Generation service returned a non-success status.
    ServiceError,
    /// Generation service returned an undecodable envelope.
    ProtocolError,
    /// No documentation could be recovered from the reply.
    MalformedReply,
}

impl FailureKind {
    /// Stable name for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransportTimeout => "transport_timeout",
            Self::Unreachable => "unreachable",
            Self::ServiceError => "service_error",
            Self::ProtocolError => "protocol_error",
            Self::MalformedReply => "malformed_reply",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route left out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFailure {
    /// The route file.
    pub file_path: PathBuf,
    /// Failure category.
    pub kind: FailureKind,
    /// Full error message.
    pub message: String,
}

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Units handed to the pipeline.
    pub discovered: usize,
    /// Units whose documentation was assembled.
    pub succeeded: usize,
    /// Units that failed.
    pub failed: usize,
    /// Units never started because the deadline passed.
    pub skipped: usize,
    /// Assembled units that replaced an earlier entry for the same path.
    pub overwritten: usize,
    /// One entry per failed unit, in completion order.
    pub failures: Vec<RouteFailure>,
}

impl RunSummary {
    fn new(discovered: usize) -> Self {
        Self {
            discovered,
            ..Self::default()
        }
    }

    /// The run-level error implied by these counts, if any.
    ///
    /// A run that found routes but documented none of them has failed.
    #[must_use]
    pub fn run_error(&self) -> Option<RoutedocError> {
        if self.discovered > 0 && self.succeeded == 0 {
            Some(RoutedocError::NothingDocumented {
                discovered: self.discovered,
            })
        } else {
            None
        }
    }
}

/// The outcome of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The assembled document.
    pub document: SpecificationDocument,
    /// Run counts and failures.
    pub summary: RunSummary,
}

/// Default number of generation calls in flight.
pub const DEFAULT_WORKERS: usize = 3;

/// Tuning knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Maximum generation calls in flight. Values below 1 are treated as 1.
    pub workers: usize,
    /// Extra attempts for retryable generation failures.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_backoff: Duration,
    /// Once this much time has passed, units not yet started are skipped.
    pub deadline: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_retries: 0,
            retry_backoff: Duration::from_secs(1),
            deadline: None,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
            deadline: config.deadline(),
        }
    }
}

enum RouteOutcome {
    Documented(RouteDocumentation),
    Failed(RouteError),
    Skipped,
}

/// Drives route units through generation and assembly.
#[derive(Debug)]
pub struct Pipeline<G> {
    generator: G,
    options: PipelineOptions,
}

impl<G: Generator> Pipeline<G> {
    /// Create a pipeline over `generator`.
    pub const fn new(generator: G, options: PipelineOptions) -> Self {
        Self { generator, options }
    }

    /// The options this pipeline runs with.
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Document a single route: compose, generate, parse.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if generation fails after all retries or the
    /// reply cannot be parsed.
    pub async fn document_route(&self, unit: &RouteUnit) -> std::result::Result<RouteDocumentation, RouteError> {
        let prompt = compose_prompt(unit);
        let reply = self.generate_with_retry(&prompt, unit.path()).await?;
        Ok(parse_reply(&reply)?)
    }

    async fn generate_with_retry(
        &self,
        prompt: &str,
        path: &Path,
    ) -> std::result::Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.generator.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    warn!(
                        path = %path.display(),
                        error = %e,
                        attempt,
                        max_retries = self.options.max_retries,
                        "Generation failed, retrying"
                    );
                    tokio::time::sleep(self.options.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Document every unit and assemble the results.
    ///
    /// Per-route failures are logged and counted; they never stop the run.
    pub async fn run(&self, units: Vec<RouteUnit>) -> RunReport {
        let total = units.len();
        let deadline = self.options.deadline.map(|d| Instant::now() + d);

        info!(routes = total, workers = self.options.workers.max(1), "Processing routes");

        let mut results = stream::iter(units.into_iter().enumerate().map(|(idx, unit)| {
            let span = info_span!("route", path = %unit.file_path.display());
            async move {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return (unit, RouteOutcome::Skipped);
                }
                info!("Processing route {}/{}", idx + 1, total);
                let outcome = match self.document_route(&unit).await {
                    Ok(doc) => RouteOutcome::Documented(doc),
                    Err(e) => RouteOutcome::Failed(e),
                };
                (unit, outcome)
            }
            .instrument(span)
        }))
        .buffer_unordered(self.options.workers.max(1));

        let mut assembler = Assembler::new();
        let mut summary = RunSummary::new(total);

        while let Some((unit, outcome)) = results.next().await {
            match outcome {
                RouteOutcome::Documented(doc) => {
                    summary.succeeded += 1;
                    if assembler.add(&doc) {
                        summary.overwritten += 1;
                    }
                }
                RouteOutcome::Failed(e) => {
                    warn!(path = %unit.file_path.display(), kind = %e.kind(), error = %e, "Failed to document route");
                    summary.failed += 1;
                    summary.failures.push(RouteFailure {
                        file_path: unit.file_path,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
                RouteOutcome::Skipped => {
                    summary.skipped += 1;
                }
            }
        }

        if summary.skipped > 0 {
            warn!(skipped = summary.skipped, "Deadline reached; remaining routes were not processed");
        }
        info!(
            discovered = summary.discovered,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Route processing complete"
        );

        RunReport {
            document: assembler.finish(),
            summary,
        }
    }

    /// Discover routes under `root` and run them.
    ///
    /// # Errors
    ///
    /// Returns an error only if discovery cannot start.
    pub async fn run_dir(&self, root: &Path) -> Result<RunReport> {
        let units = RouteDiscoverer::new(root).discover()?;
        Ok(self.run(units).await)
    }
}

/// How a configured run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Discovery found no route files. Nothing was generated or written.
    NoRoutes,
    /// Routes were processed and the document was written.
    Written {
        /// The run result.
        report: RunReport,
        /// Where the document was written.
        output: PathBuf,
    },
}

impl RunOutcome {
    /// The run-level error implied by this outcome, if any.
    ///
    /// Finding no routes is not an error. Finding routes and documenting
    /// none of them is, even though the (empty) document has been written.
    #[must_use]
    pub fn run_error(&self) -> Option<RoutedocError> {
        match self {
            Self::NoRoutes => None,
            Self::Written { report, .. } => report.summary.run_error(),
        }
    }
}

/// Discover, document and write according to `config`.
///
/// With no routes under the API directory nothing is written. Otherwise the
/// document is always written, including when every route failed; check
/// [`RunOutcome::run_error`] for that case.
///
/// # Errors
///
/// Returns an error if discovery cannot start, the generation client cannot
/// be built, or the document cannot be written.
pub async fn run_with_config(config: &Config) -> Result<RunOutcome> {
    let units = RouteDiscoverer::new(&config.api_dir).discover()?;
    if units.is_empty() {
        info!(api_dir = %config.api_dir.display(), "No routes found. Exiting.");
        return Ok(RunOutcome::NoRoutes);
    }
    info!(count = units.len(), "Found routes");

    let client = OllamaClient::new(&config.ollama_url, config.model.clone(), config.timeout())?;
    let report = Pipeline::new(client, PipelineOptions::from(config))
        .run(units)
        .await;

    write_specification(&config.output, &report.document)?;

    Ok(RunOutcome::Written {
        report,
        output: config.output.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RouteFileKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replies keyed by a substring of the route file path found in the prompt.
    struct ScriptedGenerator {
        replies: HashMap<&'static str, std::result::Result<String, GenerationError>>,
        delay: Duration,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<(&'static str, std::result::Result<String, GenerationError>)>) -> Self {
            Self {
                replies: replies.into_iter().collect(),
                delay: Duration::ZERO,
            }
        }
    }

    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies
                .iter()
                .find(|(key, _)| prompt.contains(&format!("File: {key}\n")))
                .map_or_else(
                    || Err(GenerationError::ServiceError { status: 404 }),
                    |(_, reply)| reply.clone(),
                )
        }
    }

    /// Fails with a retryable error a fixed number of times, then succeeds.
    struct FlakyGenerator {
        failures_left: AtomicUsize,
        calls: Arc<AtomicUsize>,
        error: GenerationError,
    }

    impl Generator for FlakyGenerator {
        async fn generate(&self, _prompt: &str) -> std::result::Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(self.error.clone());
            }
            Ok(r#"{"path":"/ok","methods":{"GET":{}}}"#.to_string())
        }
    }

    fn unit(path: &str) -> RouteUnit {
        RouteUnit::new(path, RouteFileKind::Ts, "export async function GET() {}")
    }

    fn reply(path: &str, method: &str, summary: &str) -> std::result::Result<String, GenerationError> {
        Ok(format!(
            r#"{{"path":"{path}","description":"d","methods":{{"{method}":{{"summary":"{summary}","description":"","parameters":[]}}}}}}"#
        ))
    }

    fn sequential() -> PipelineOptions {
        PipelineOptions {
            workers: 1,
            retry_backoff: Duration::from_millis(1),
            ..PipelineOptions::default()
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let generator = ScriptedGenerator::new(vec![
            ("a/route.ts", reply("/a", "GET", "a")),
            ("b/route.ts", Err(GenerationError::TransportTimeout { timeout_secs: 30 })),
            ("c/route.ts", Ok("I am unable to help with that.".to_string())),
            ("d/route.ts", Err(GenerationError::ServiceError { status: 500 })),
            ("e/route.ts", Err(GenerationError::ProtocolError { message: "eof".into() })),
            ("f/route.ts", reply("/f", "POST", "f")),
        ]);
        let pipeline = Pipeline::new(generator, sequential());
        let units = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|d| unit(&format!("{d}/route.ts")))
            .collect();

        let report = pipeline.run(units).await;
        assert_eq!(report.summary.discovered, 6);
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 4);
        assert!(report.summary.run_error().is_none());

        let kinds: Vec<_> = report.summary.failures.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FailureKind::TransportTimeout,
                FailureKind::MalformedReply,
                FailureKind::ServiceError,
                FailureKind::ProtocolError,
            ]
        );
        assert!(report.summary.failures[0].file_path.ends_with("b/route.ts"));

        let paths: Vec<_> = report.document.paths.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["/a", "/f"]);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_document() {
        let generator = ScriptedGenerator::new(vec![]);
        let pipeline = Pipeline::new(generator, sequential());

        let report = pipeline.run(vec![unit("x/route.ts"), unit("y/route.ts")]).await;
        assert!(report.document.paths.is_empty());
        assert_eq!(report.document.openapi, "3.0.0");
        assert_eq!(report.summary.failed, 2);
        assert!(matches!(
            report.summary.run_error(),
            Some(RoutedocError::NothingDocumented { discovered: 2 })
        ));
    }

    #[tokio::test]
    async fn test_no_units_is_not_a_failure() {
        let pipeline = Pipeline::new(ScriptedGenerator::new(vec![]), sequential());
        let report = pipeline.run(Vec::new()).await;
        assert!(report.document.paths.is_empty());
        assert!(report.summary.run_error().is_none());
    }

    #[tokio::test]
    async fn test_sequential_collision_keeps_later_route() {
        let generator = ScriptedGenerator::new(vec![
            ("first/route.ts", reply("/same", "GET", "first")),
            ("second/route.ts", reply("/same", "POST", "second")),
        ]);
        let pipeline = Pipeline::new(generator, sequential());

        let report = pipeline
            .run(vec![unit("first/route.ts"), unit("second/route.ts")])
            .await;
        let item = &report.document.paths["/same"];
        let methods: Vec<_> = item.keys().map(String::as_str).collect();
        assert_eq!(methods, vec!["post"]);
        assert_eq!(report.summary.overwritten, 1);
    }

    #[tokio::test]
    async fn test_parallel_run_documents_every_route() {
        let mut replies = Vec::new();
        let names: Vec<&'static str> = vec!["p0/route.ts", "p1/route.ts", "p2/route.ts", "p3/route.ts", "p4/route.ts"];
        for (i, name) in names.iter().enumerate() {
            replies.push((*name, reply(&format!("/p{i}"), "GET", "s")));
        }
        let mut generator = ScriptedGenerator::new(replies);
        generator.delay = Duration::from_millis(20);

        let pipeline = Pipeline::new(
            generator,
            PipelineOptions {
                workers: 3,
                ..sequential()
            },
        );
        let report = pipeline.run(names.iter().map(|n| unit(n)).collect()).await;
        assert_eq!(report.summary.succeeded, 5);
        assert_eq!(report.document.paths.len(), 5);
    }

    #[tokio::test]
    async fn test_retryable_errors_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = FlakyGenerator {
            failures_left: AtomicUsize::new(2),
            calls: Arc::clone(&calls),
            error: GenerationError::ServiceError { status: 503 },
        };
        let pipeline = Pipeline::new(
            generator,
            PipelineOptions {
                max_retries: 2,
                ..sequential()
            },
        );

        let report = pipeline.run(vec![unit("r/route.ts")]).await;
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = FlakyGenerator {
            failures_left: AtomicUsize::new(10),
            calls: Arc::clone(&calls),
            error: GenerationError::TransportTimeout { timeout_secs: 1 },
        };
        let pipeline = Pipeline::new(
            generator,
            PipelineOptions {
                max_retries: 1,
                ..sequential()
            },
        );

        let report = pipeline.run(vec![unit("r/route.ts")]).await;
        assert_eq!(report.summary.failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_fail_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = FlakyGenerator {
            failures_left: AtomicUsize::new(1),
            calls: Arc::clone(&calls),
            error: GenerationError::ServiceError { status: 400 },
        };
        let pipeline = Pipeline::new(
            generator,
            PipelineOptions {
                max_retries: 3,
                ..sequential()
            },
        );

        let report = pipeline.run(vec![unit("r/route.ts")]).await;
        assert_eq!(report.summary.failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_deadline_skips_everything() {
        let generator = ScriptedGenerator::new(vec![("a/route.ts", reply("/a", "GET", "a"))]);
        let pipeline = Pipeline::new(
            generator,
            PipelineOptions {
                deadline: Some(Duration::ZERO),
                ..sequential()
            },
        );

        let report = pipeline.run(vec![unit("a/route.ts"), unit("b/route.ts")]).await;
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.summary.succeeded, 0);
        assert!(report.document.paths.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_keeps_already_assembled_routes() {
        let mut generator = ScriptedGenerator::new(vec![
            ("a/route.ts", reply("/a", "GET", "a")),
            ("b/route.ts", reply("/b", "GET", "b")),
            ("c/route.ts", reply("/c", "GET", "c")),
        ]);
        generator.delay = Duration::from_millis(300);
        let pipeline = Pipeline::new(
            generator,
            PipelineOptions {
                deadline: Some(Duration::from_millis(100)),
                ..sequential()
            },
        );

        let report = pipeline
            .run(vec![unit("a/route.ts"), unit("b/route.ts"), unit("c/route.ts")])
            .await;
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.skipped, 2);
        assert!(report.document.paths.contains_key("/a"));
    }

    #[test]
    fn test_options_default_matches_config_default() {
        let options = PipelineOptions::default();
        assert_eq!(options, PipelineOptions::from(&Config::default()));
        assert_eq!(options.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_no_routes_outcome_is_not_an_error() {
        assert!(RunOutcome::NoRoutes.run_error().is_none());
    }

    #[test]
    fn test_route_error_kinds() {
        let err: RouteError = ReplyError::MalformedReply {
            reason: "r".into(),
            text: "t".into(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::MalformedReply);
        assert_eq!(err.kind().as_str(), "malformed_reply");

        let err: RouteError = GenerationError::Unreachable { message: "refused".into() }.into();
        assert_eq!(err.kind(), FailureKind::Unreachable);
    }
}
