//! Conversion by graph traversal with path substitution on failure.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use convgraph_core::config::search::SearchConfig;
use convgraph_core::error::{AppError, ErrorKind};
use convgraph_core::result::AppResult;
use convgraph_core::traits::handler::ConvertOptions;
use convgraph_core::types::file::FileData;
use convgraph_graph::{ConversionGraph, NodeId, NodeSelector, Path, SearchMode};

use crate::error::ConversionError;
use crate::executor::{PathExecutor, StepFailure};
use crate::metrics::ConversionMetrics;

/// A finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// Identifier of this run, also recorded on its tracing span.
    pub run_id: Uuid,
    /// Output files of the last step.
    pub files: Vec<FileData>,
    /// The path that produced them.
    pub path: Path,
    /// Paths tried, including the successful one.
    pub attempts: usize,
    /// Edge mode the successful path was found in.
    pub mode: SearchMode,
    /// Wall-clock time of the whole run.
    pub duration: Duration,
}

/// Finds and executes conversion paths until one succeeds.
///
/// A path that fails is never retried. Instead the node whose step failed
/// is excluded and the search starts over, so every retry strictly shrinks
/// the graph and the loop ends when the search runs dry.
#[derive(Debug, Clone)]
pub struct Traverser {
    graph: Arc<ConversionGraph>,
    executor: PathExecutor,
    search: SearchConfig,
    metrics: Arc<ConversionMetrics>,
}

impl Traverser {
    /// Create a traverser searching `graph` and running paths on `executor`.
    pub fn new(
        graph: Arc<ConversionGraph>,
        executor: PathExecutor,
        search: SearchConfig,
        metrics: Arc<ConversionMetrics>,
    ) -> Self {
        Self {
            graph,
            executor,
            search,
            metrics,
        }
    }

    /// Modes tried in order.
    fn modes(&self) -> &'static [SearchMode] {
        if self.search.simple_first {
            &[SearchMode::Simple, SearchMode::Full]
        } else {
            &[SearchMode::Full]
        }
    }

    /// Convert `files` from one format to another through any chain of
    /// handlers.
    ///
    /// Returns `Ok(None)` when no path exists at all, and an error naming the
    /// last failing handler and its formats when paths existed but none
    /// succeeded.
    pub async fn try_convert_by_traversing(
        &self,
        files: Vec<FileData>,
        from: &NodeSelector,
        to: &NodeSelector,
    ) -> AppResult<Option<ConversionOutcome>> {
        self.try_convert_with(
            files,
            from,
            to,
            &ConvertOptions::default(),
            CancellationToken::new(),
        )
        .await
    }

    /// [`Self::try_convert_by_traversing`] with handler options and a
    /// cancellation token, checked between steps and between attempts.
    #[instrument(skip_all, fields(run_id, from = %from, to = %to))]
    pub async fn try_convert_with(
        &self,
        files: Vec<FileData>,
        from: &NodeSelector,
        to: &NodeSelector,
        options: &ConvertOptions,
        cancel: CancellationToken,
    ) -> AppResult<Option<ConversionOutcome>> {
        let run_id = Uuid::now_v7();
        tracing::Span::current().record("run_id", run_id.to_string());

        if files.is_empty() {
            return Err(AppError::validation("No input files to convert"));
        }

        self.metrics.record_started();
        let start = Instant::now();
        let input_bytes: u64 = files.iter().map(|f| f.len() as u64).sum();

        let mut excluded: HashSet<NodeId> = HashSet::new();
        let mut attempts = 0usize;
        let mut last_failure: Option<StepFailure> = None;

        for &mode in self.modes() {
            loop {
                if cancel.is_cancelled() {
                    self.metrics.record_cancelled();
                    return Err(ConversionError::Cancelled.into());
                }

                let next = self
                    .graph
                    .search_path(from, to, mode)
                    .excluding(excluded.iter().copied())
                    .next();
                let Some(path) = next else {
                    break;
                };

                attempts += 1;
                if attempts > 1 {
                    self.metrics.record_fallback();
                }
                info!(attempt = attempts, mode = %mode, path = %path, "Trying conversion path");

                match self
                    .executor
                    .execute(&path, files.clone(), options, &cancel)
                    .await
                {
                    Ok(output) => {
                        let duration = start.elapsed();
                        let output_bytes = output.iter().map(|f| f.len() as u64).sum();
                        self.metrics
                            .record_success(duration, input_bytes, output_bytes);
                        info!(
                            attempts,
                            steps = path.steps(),
                            outputs = output.len(),
                            duration_ms = duration.as_millis() as u64,
                            "Conversion succeeded"
                        );
                        return Ok(Some(ConversionOutcome {
                            run_id,
                            files: output,
                            path,
                            attempts,
                            mode,
                            duration,
                        }));
                    }
                    Err(failure) if failure.error.is_terminal() => {
                        self.metrics.record_cancelled();
                        return Err(failure.error.into());
                    }
                    Err(failure) => {
                        warn!(
                            attempt = attempts,
                            step = failure.step,
                            node = %failure.node,
                            error = %failure.error,
                            "Conversion path failed, searching for another"
                        );
                        excluded.insert(failure.node.id());
                        last_failure = Some(failure);
                    }
                }
            }
        }

        match last_failure {
            Some(failure) => {
                self.metrics.record_failure();
                Err(exhausted(failure, attempts))
            }
            None => {
                self.metrics.record_no_path();
                info!("No conversion path found");
                Ok(None)
            }
        }
    }
}

fn exhausted(failure: StepFailure, attempts: usize) -> AppError {
    let handler = failure.node.handler();
    let from = &failure.input.format().id;
    let to = &failure.node.format().id;
    AppError::with_source(
        ErrorKind::Conversion,
        format!(
            "All {attempts} conversion path(s) failed; last failure in handler '{handler}' converting {from} → {to}"
        ),
        failure.error,
    )
}
