//! Runs the steps of one path in order.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use convgraph_core::config::execution::ExecutionConfig;
use convgraph_core::traits::handler::ConvertOptions;
use convgraph_core::types::file::FileData;
use convgraph_graph::{Node, Path};

use crate::error::ConversionError;
use crate::metrics::ConversionMetrics;
use crate::registry::HandlerRegistry;

/// The step that broke a path.
#[derive(Debug, Clone)]
pub struct StepFailure {
    /// Node the failing step was converting from.
    pub input: Node,
    /// Node the failing step was converting into.
    pub node: Node,
    /// Zero-based step index.
    pub step: usize,
    /// What went wrong.
    pub error: ConversionError,
}

/// Executes a path step by step.
///
/// Each step hands the previous step's files to the handler of the next
/// node. Intermediate files are dropped as soon as the following step
/// returns, and nothing is surfaced unless the whole path succeeds.
#[derive(Debug, Clone)]
pub struct PathExecutor {
    registry: Arc<HandlerRegistry>,
    config: ExecutionConfig,
    metrics: Arc<ConversionMetrics>,
}

impl PathExecutor {
    /// Create an executor resolving handlers through `registry`.
    pub fn new(
        registry: Arc<HandlerRegistry>,
        config: ExecutionConfig,
        metrics: Arc<ConversionMetrics>,
    ) -> Self {
        Self {
            registry,
            config,
            metrics,
        }
    }

    /// Run every step of `path`. A zero-step path returns `files` unchanged.
    pub async fn execute(
        &self,
        path: &Path,
        files: Vec<FileData>,
        options: &ConvertOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileData>, StepFailure> {
        let mut current = files;
        for (step, (input, output)) in path.hops().enumerate() {
            let fail = |error: ConversionError| StepFailure {
                input: input.clone(),
                node: output.clone(),
                step,
                error,
            };
            if cancel.is_cancelled() {
                return Err(fail(ConversionError::Cancelled));
            }
            current = match self.step(input, output, current, options, cancel).await {
                Ok(files) => files,
                Err(error) => {
                    // Init failures are counted by the registry.
                    if !error.is_terminal() && !error.is_handler_failure() {
                        self.metrics.record_step_failure();
                    }
                    return Err(fail(error));
                }
            };
        }
        Ok(current)
    }

    async fn step(
        &self,
        input: &Node,
        output: &Node,
        files: Vec<FileData>,
        options: &ConvertOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileData>, ConversionError> {
        let handler_name = output.handler();
        let from = input.format();
        let to = output.format();

        let handler = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConversionError::Cancelled),
            ready = self.registry.ensure_ready(handler_name) => ready?,
        };

        debug!(
            handler = handler_name,
            from = %from.id,
            to = %to.id,
            files = files.len(),
            "Executing step"
        );
        let start = Instant::now();
        let timeout = self.config.step_timeout();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConversionError::Cancelled),
            result = tokio::time::timeout(timeout, handler.convert(files, from, to, options)) => result,
        };

        let produced = match result {
            Ok(Ok(files)) => files,
            Ok(Err(source)) => {
                warn!(handler = handler_name, from = %from.id, to = %to.id, error = %source, "Step failed");
                return Err(ConversionError::StepFailed {
                    handler: handler_name.to_string(),
                    from: from.id.clone(),
                    to: to.id.clone(),
                    source,
                });
            }
            Err(_) => {
                warn!(
                    handler = handler_name,
                    from = %from.id,
                    to = %to.id,
                    timeout_secs = timeout.as_secs(),
                    "Step timed out"
                );
                return Err(ConversionError::StepTimeout {
                    handler: handler_name.to_string(),
                    from: from.id.clone(),
                    to: to.id.clone(),
                    seconds: timeout.as_secs(),
                });
            }
        };

        if let Some(reason) = self.malformed(&produced) {
            warn!(handler = handler_name, from = %from.id, to = %to.id, reason = %reason, "Malformed step output");
            return Err(ConversionError::MalformedOutput {
                handler: handler_name.to_string(),
                from: from.id.clone(),
                to: to.id.clone(),
                reason,
            });
        }

        debug!(
            handler = handler_name,
            outputs = produced.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Step completed"
        );
        Ok(produced)
    }

    fn malformed(&self, files: &[FileData]) -> Option<String> {
        if files.is_empty() {
            return Some("no files produced".to_string());
        }
        let min = self.config.min_output_bytes;
        files.iter().find(|f| f.len() < min).map(|f| {
            format!(
                "'{}' has {} bytes, expected at least {min}",
                f.name,
                f.len()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use convgraph_cache::CapabilityCache;
    use convgraph_core::catalog::FormatCatalog;
    use convgraph_core::traits::handler::{Handler, HandlerError};
    use convgraph_core::types::capability::SupportedFormat;
    use convgraph_core::types::format::Format;
    use convgraph_graph::{ConversionGraph, NodeSelector, SearchMode};

    use super::*;

    #[derive(Debug)]
    enum Behavior {
        Tag,
        Empty,
        Hang,
        Fail,
    }

    #[derive(Debug)]
    struct Scripted {
        name: &'static str,
        formats: Vec<SupportedFormat>,
        behavior: Behavior,
    }

    #[async_trait]
    impl Handler for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn declared_formats(&self) -> Vec<SupportedFormat> {
            self.formats.clone()
        }

        async fn init(&self) -> Result<Vec<SupportedFormat>, HandlerError> {
            Ok(self.formats.clone())
        }

        async fn convert(
            &self,
            files: Vec<FileData>,
            _input: &Format,
            output: &Format,
            _options: &ConvertOptions,
        ) -> Result<Vec<FileData>, HandlerError> {
            match self.behavior {
                Behavior::Tag => Ok(files
                    .into_iter()
                    .map(|f| {
                        let mut bytes = f.bytes.to_vec();
                        bytes.extend_from_slice(output.id.as_bytes());
                        FileData::new(f.renamed(&output.extension), bytes)
                    })
                    .collect()),
                Behavior::Empty => Ok(vec![FileData::new("empty.bin", Vec::new())]),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(files)
                }
                Behavior::Fail => Err(HandlerError::Decode("corrupt header".into())),
            }
        }
    }

    struct Fixture {
        cache: Arc<CapabilityCache>,
        graph: ConversionGraph,
        executor: PathExecutor,
        metrics: Arc<ConversionMetrics>,
    }

    fn fixture(behavior: Behavior) -> Fixture {
        let catalog = Arc::new(FormatCatalog::builtin());
        let cache = Arc::new(CapabilityCache::new());
        let metrics = Arc::new(ConversionMetrics::new());
        let registry = Arc::new(HandlerRegistry::new(
            Arc::clone(&cache),
            Duration::from_secs(5),
            Arc::clone(&metrics),
        ));
        let formats = ["png", "bmp"]
            .iter()
            .map(|id| SupportedFormat::both(catalog.get(id).cloned().expect("format")))
            .collect();
        registry
            .register(Arc::new(Scripted {
                name: "scripted",
                formats,
                behavior,
            }))
            .expect("register");

        let config = ExecutionConfig {
            step_timeout_seconds: 2,
            ..ExecutionConfig::default()
        };
        Fixture {
            graph: ConversionGraph::new(catalog, Arc::clone(&cache)),
            cache,
            executor: PathExecutor::new(registry, config, Arc::clone(&metrics)),
            metrics,
        }
    }

    fn first_path(graph: &ConversionGraph, from: &str, to: &str) -> Path {
        graph
            .search_path(
                &NodeSelector::format(from),
                &NodeSelector::format(to),
                SearchMode::Full,
            )
            .next()
            .expect("path")
    }

    fn input() -> Vec<FileData> {
        vec![FileData::new("photo.png", b"PNG".to_vec())]
    }

    #[tokio::test]
    async fn test_executes_steps() {
        let fx = fixture(Behavior::Tag);
        let path = first_path(&fx.graph, "png", "bmp");
        let out = fx
            .executor
            .execute(&path, input(), &ConvertOptions::new(), &CancellationToken::new())
            .await
            .expect("execute");
        assert_eq!(out[0].name, "photo.bmp");
        assert_eq!(&out[0].bytes[..], b"PNGbmp");
    }

    #[tokio::test]
    async fn test_zero_step_path_is_identity() {
        let fx = fixture(Behavior::Fail);
        let path = first_path(&fx.graph, "png", "png");
        let out = fx
            .executor
            .execute(&path, input(), &ConvertOptions::new(), &CancellationToken::new())
            .await
            .expect("identity");
        assert_eq!(out, input());
    }

    #[tokio::test]
    async fn test_handler_error_names_step() {
        let fx = fixture(Behavior::Fail);
        let path = first_path(&fx.graph, "png", "bmp");
        let failure = fx
            .executor
            .execute(&path, input(), &ConvertOptions::new(), &CancellationToken::new())
            .await
            .expect_err("fails");
        assert_eq!(failure.step, 0);
        assert_eq!(failure.input.format().id, "png");
        assert_eq!(failure.node.format().id, "bmp");
        assert!(matches!(failure.error, ConversionError::StepFailed { .. }));
        assert_eq!(fx.metrics.snapshot().step_failures, 1);
    }

    #[tokio::test]
    async fn test_unregistered_handler_is_not_a_step_failure() {
        let fx = fixture(Behavior::Tag);
        let catalog = FormatCatalog::builtin();
        let gif = SupportedFormat::both(catalog.get("gif").cloned().expect("gif"));
        let png = SupportedFormat::both(catalog.get("png").cloned().expect("png"));
        fx.cache.register("imported", vec![png, gif]);

        let path = first_path(&fx.graph, "png", "gif");
        let failure = fx
            .executor
            .execute(&path, input(), &ConvertOptions::new(), &CancellationToken::new())
            .await
            .expect_err("no such handler");
        assert!(failure.error.is_handler_failure());
        assert_eq!(failure.input.format().id, "png");
        assert_eq!(failure.node.handler(), "imported");
        assert_eq!(fx.metrics.snapshot().step_failures, 0);
    }

    #[tokio::test]
    async fn test_empty_payload_is_malformed() {
        let fx = fixture(Behavior::Empty);
        let path = first_path(&fx.graph, "png", "bmp");
        let failure = fx
            .executor
            .execute(&path, input(), &ConvertOptions::new(), &CancellationToken::new())
            .await
            .expect_err("malformed");
        assert!(matches!(
            failure.error,
            ConversionError::MalformedOutput { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timeout() {
        let fx = fixture(Behavior::Hang);
        let path = first_path(&fx.graph, "png", "bmp");
        let failure = fx
            .executor
            .execute(&path, input(), &ConvertOptions::new(), &CancellationToken::new())
            .await
            .expect_err("timeout");
        assert!(matches!(
            failure.error,
            ConversionError::StepTimeout { seconds: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let fx = fixture(Behavior::Tag);
        let path = first_path(&fx.graph, "png", "bmp");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let failure = fx
            .executor
            .execute(&path, input(), &ConvertOptions::new(), &cancel)
            .await
            .expect_err("cancelled");
        assert!(failure.error.is_terminal());
    }
}
