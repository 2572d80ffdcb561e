//! Owns handler instances and drives their lifecycle.
//!
//! Registration publishes declared capabilities to the cache right away.
//! Initialization is lazy and happens at most once per handler, no matter
//! how many conversions need the handler concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use convgraph_cache::CapabilityCache;
use convgraph_core::error::AppError;
use convgraph_core::result::AppResult;
use convgraph_core::traits::handler::{Handler, HandlerState};

use crate::error::ConversionError;
use crate::metrics::ConversionMetrics;

#[derive(Debug)]
struct HandlerSlot {
    handler: Arc<dyn Handler>,
    init: OnceCell<Result<(), ConversionError>>,
}

/// Summary of one registered handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerInfo {
    /// Handler name.
    pub name: String,
    /// Lifecycle state.
    pub state: HandlerState,
    /// Number of input formats.
    pub inputs: usize,
    /// Number of output formats.
    pub outputs: usize,
    /// Number of records flagged common.
    pub common: usize,
    /// Failure reason, for failed handlers.
    pub failure: Option<String>,
}

/// Registry of conversion handlers.
#[derive(Debug)]
pub struct HandlerRegistry {
    cache: Arc<CapabilityCache>,
    slots: DashMap<String, Arc<HandlerSlot>>,
    init_timeout: Duration,
    metrics: Arc<ConversionMetrics>,
}

impl HandlerRegistry {
    /// Create an empty registry publishing into `cache`.
    pub fn new(
        cache: Arc<CapabilityCache>,
        init_timeout: Duration,
        metrics: Arc<ConversionMetrics>,
    ) -> Self {
        Self {
            cache,
            slots: DashMap::new(),
            init_timeout,
            metrics,
        }
    }

    /// Register a handler.
    ///
    /// Declared formats go straight into the cache. A handler that declares
    /// nothing keeps whatever the cache already knows about it, e.g. from an
    /// imported export.
    pub fn register(&self, handler: Arc<dyn Handler>) -> AppResult<()> {
        let name = handler.name().to_string();
        if name.trim().is_empty() {
            return Err(AppError::validation("Handler name must not be empty"));
        }

        match self.slots.entry(name.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::validation(format!(
                    "Handler '{name}' is already registered"
                )));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(HandlerSlot {
                    handler: Arc::clone(&handler),
                    init: OnceCell::new(),
                }));
            }
        }

        let declared = handler.declared_formats();
        let declared_count = declared.len();
        if !declared.is_empty() {
            self.cache.register(&name, declared);
        } else if self.cache.entry(&name).is_none() {
            self.cache.register(&name, Vec::new());
        }
        if handler.is_ready() {
            self.cache.set_state(&name, HandlerState::Ready);
        }

        info!(handler = %name, declared = declared_count, "Handler registered");
        Ok(())
    }

    /// Registered handler names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.cache
            .handler_names()
            .into_iter()
            .filter(|name| self.slots.contains_key(name))
            .collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Return the handler once it is initialized.
    ///
    /// Concurrent callers share a single `init` call. A failed handler stays
    /// failed for the lifetime of the registry.
    pub async fn ensure_ready(&self, name: &str) -> Result<Arc<dyn Handler>, ConversionError> {
        let Some(slot) = self.slots.get(name).map(|slot| Arc::clone(slot.value())) else {
            // Known to the cache only through an import.
            if self.cache.entry(name).is_some() {
                self.cache
                    .mark_failed(name, "no handler registered under this name");
            }
            return Err(ConversionError::HandlerNotFound {
                handler: name.to_string(),
            });
        };

        slot.init
            .get_or_init(|| self.initialize(Arc::clone(&slot.handler)))
            .await
            .clone()
            .map(|()| Arc::clone(&slot.handler))
    }

    async fn initialize(&self, handler: Arc<dyn Handler>) -> Result<(), ConversionError> {
        let name = handler.name().to_string();
        if handler.is_ready() {
            self.cache.set_state(&name, HandlerState::Ready);
            return Ok(());
        }

        self.cache.set_state(&name, HandlerState::Initializing);
        debug!(handler = %name, "Initializing handler");
        let start = Instant::now();

        match tokio::time::timeout(self.init_timeout, handler.init()).await {
            Ok(Ok(formats)) => {
                let count = formats.len();
                if formats.is_empty() {
                    warn!(handler = %name, "Handler reported no formats; keeping cached capabilities");
                } else {
                    self.cache.register(&name, formats);
                }
                self.cache.set_state(&name, HandlerState::Ready);
                info!(
                    handler = %name,
                    formats = count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Handler ready"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.metrics.record_init_failure();
                self.cache.mark_failed(&name, e.to_string());
                error!(handler = %name, error = %e, "Handler initialization failed");
                Err(ConversionError::InitFailed {
                    handler: name,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                let seconds = self.init_timeout.as_secs();
                self.metrics.record_init_failure();
                self.cache
                    .mark_failed(&name, format!("initialization timed out after {seconds}s"));
                error!(handler = %name, timeout_secs = seconds, "Handler initialization timed out");
                Err(ConversionError::InitTimeout {
                    handler: name,
                    seconds,
                })
            }
        }
    }

    /// Initialize every handler concurrently and wait for all of them.
    pub async fn init_all(&self) -> Vec<(String, Result<(), ConversionError>)> {
        let names = self.names();
        let tasks = names.iter().map(|name| async move {
            let result = self.ensure_ready(name).await.map(|_| ());
            (name.clone(), result)
        });
        futures::future::join_all(tasks).await
    }

    /// Initialize only handlers whose capabilities the cache does not know.
    ///
    /// Handlers covered by declared formats or an imported export stay
    /// uninitialized until a path actually uses them.
    pub async fn init_undiscovered(&self) -> Vec<(String, Result<(), ConversionError>)> {
        let pending: Vec<String> = self
            .names()
            .into_iter()
            .filter(|name| self.cache.get(name).is_empty())
            .collect();
        let tasks = pending.iter().map(|name| async move {
            let result = self.ensure_ready(name).await.map(|_| ());
            (name.clone(), result)
        });
        futures::future::join_all(tasks).await
    }

    /// Initialize every handler on background tasks, one per handler.
    pub fn spawn_init_all(
        self: &Arc<Self>,
    ) -> JoinSet<(String, Result<(), ConversionError>)> {
        let mut set = JoinSet::new();
        for name in self.names() {
            let registry = Arc::clone(self);
            set.spawn(async move {
                let result = registry.ensure_ready(&name).await.map(|_| ());
                (name, result)
            });
        }
        set
    }

    /// Per-handler summary in registration order.
    pub fn describe(&self) -> Vec<HandlerInfo> {
        self.cache
            .snapshot()
            .entries()
            .iter()
            .filter(|entry| self.slots.contains_key(&entry.handler))
            .map(|entry| HandlerInfo {
                name: entry.handler.clone(),
                state: entry.state,
                inputs: entry.inputs().count(),
                outputs: entry.outputs().count(),
                common: entry.formats.iter().filter(|f| f.common).count(),
                failure: entry.failure.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use convgraph_core::catalog::FormatCatalog;
    use convgraph_core::traits::handler::{ConvertOptions, HandlerError};
    use convgraph_core::types::capability::SupportedFormat;
    use convgraph_core::types::file::FileData;
    use convgraph_core::types::format::Format;

    use super::*;

    #[derive(Debug)]
    struct Scripted {
        name: &'static str,
        declared: Vec<SupportedFormat>,
        discovered: Vec<SupportedFormat>,
        init_calls: AtomicUsize,
        init_delay: Duration,
        fail: bool,
    }

    impl Scripted {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                declared: Vec::new(),
                discovered: Vec::new(),
                init_calls: AtomicUsize::new(0),
                init_delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Handler for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn is_ready(&self) -> bool {
            false
        }

        fn declared_formats(&self) -> Vec<SupportedFormat> {
            self.declared.clone()
        }

        async fn init(&self) -> Result<Vec<SupportedFormat>, HandlerError> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            if !self.init_delay.is_zero() {
                tokio::time::sleep(self.init_delay).await;
            }
            if self.fail {
                return Err(HandlerError::Init("codec missing".into()));
            }
            Ok(self.discovered.clone())
        }

        async fn convert(
            &self,
            files: Vec<FileData>,
            _input: &Format,
            _output: &Format,
            _options: &ConvertOptions,
        ) -> Result<Vec<FileData>, HandlerError> {
            Ok(files)
        }
    }

    fn registry(timeout: Duration) -> (Arc<CapabilityCache>, Arc<HandlerRegistry>) {
        let cache = Arc::new(CapabilityCache::new());
        let registry = HandlerRegistry::new(
            Arc::clone(&cache),
            timeout,
            Arc::new(ConversionMetrics::new()),
        );
        (cache, Arc::new(registry))
    }

    fn png() -> SupportedFormat {
        let catalog = FormatCatalog::builtin();
        SupportedFormat::both(catalog.get("png").cloned().expect("png"))
    }

    #[tokio::test]
    async fn test_register_publishes_declared_formats() {
        let (cache, registry) = registry(Duration::from_secs(5));
        let mut handler = Scripted::new("declared");
        handler.declared = vec![png()];
        registry.register(Arc::new(handler)).expect("register");

        assert_eq!(cache.get("declared").len(), 1);
        assert_eq!(cache.state("declared"), HandlerState::Unregistered);
        assert_eq!(registry.names(), vec!["declared"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let (_, registry) = registry(Duration::from_secs(5));
        registry.register(Arc::new(Scripted::new("twice"))).expect("first");
        let err = registry
            .register(Arc::new(Scripted::new("twice")))
            .expect_err("second");
        assert!(err.message.contains("already registered"));
    }

    #[tokio::test]
    async fn test_init_runs_once_under_concurrency() {
        let (cache, registry) = registry(Duration::from_secs(5));
        let mut handler = Scripted::new("lazy");
        handler.discovered = vec![png()];
        handler.init_delay = Duration::from_millis(20);
        let handler = Arc::new(handler);
        registry.register(handler.clone()).expect("register");

        let (a, b, c) = tokio::join!(
            registry.ensure_ready("lazy"),
            registry.ensure_ready("lazy"),
            registry.ensure_ready("lazy"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(handler.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state("lazy"), HandlerState::Ready);
        assert_eq!(cache.get("lazy").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_init_marks_cache_and_sticks() {
        let (cache, registry) = registry(Duration::from_secs(5));
        let mut handler = Scripted::new("broken");
        handler.declared = vec![png()];
        handler.fail = true;
        let handler = Arc::new(handler);
        registry.register(handler.clone()).expect("register");

        let first = registry.ensure_ready("broken").await;
        assert!(matches!(first, Err(ConversionError::InitFailed { .. })));
        let second = registry.ensure_ready("broken").await;
        assert!(second.is_err());
        assert_eq!(handler.init_calls.load(Ordering::SeqCst), 1);

        let entry = cache.entry("broken").expect("entry kept");
        assert_eq!(entry.state, HandlerState::Failed);
        assert!(entry.failure.is_some());
        assert_eq!(registry.describe()[0].state, HandlerState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_timeout() {
        let (cache, registry) = registry(Duration::from_secs(1));
        let mut handler = Scripted::new("slow");
        handler.init_delay = Duration::from_secs(30);
        registry.register(Arc::new(handler)).expect("register");

        let result = registry.ensure_ready("slow").await;
        assert!(matches!(
            result,
            Err(ConversionError::InitTimeout { seconds: 1, .. })
        ));
        assert_eq!(cache.state("slow"), HandlerState::Failed);
    }

    #[tokio::test]
    async fn test_unknown_handler() {
        let (cache, registry) = registry(Duration::from_secs(5));
        cache.register("ghost", vec![png()]);

        let result = registry.ensure_ready("ghost").await;
        assert!(matches!(result, Err(ConversionError::HandlerNotFound { .. })));
        assert_eq!(cache.state("ghost"), HandlerState::Failed);
    }

    #[tokio::test]
    async fn test_init_undiscovered_skips_known() {
        let (cache, registry) = registry(Duration::from_secs(5));
        let mut declared = Scripted::new("declared");
        declared.declared = vec![png()];
        let declared = Arc::new(declared);
        let mut hidden = Scripted::new("hidden");
        hidden.discovered = vec![png()];
        let hidden = Arc::new(hidden);
        registry.register(declared.clone()).expect("declared");
        registry.register(hidden.clone()).expect("hidden");

        let results = registry.init_undiscovered().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "hidden");
        assert_eq!(declared.init_calls.load(Ordering::SeqCst), 0);
        assert_eq!(hidden.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("hidden").len(), 1);
    }

    #[tokio::test]
    async fn test_init_all_covers_every_handler() {
        let (cache, registry) = registry(Duration::from_secs(5));
        let mut declared = Scripted::new("declared");
        declared.declared = vec![png()];
        let declared = Arc::new(declared);
        let mut failing = Scripted::new("failing");
        failing.fail = true;
        registry.register(declared.clone()).expect("declared");
        registry.register(Arc::new(failing)).expect("failing");

        let results = registry.init_all().await;
        let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["declared", "failing"]);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(ConversionError::InitFailed { .. })));
        assert_eq!(declared.init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state("declared"), HandlerState::Ready);
        assert_eq!(cache.state("failing"), HandlerState::Failed);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_spawn_init_all() {
        let (cache, registry) = registry(Duration::from_secs(5));
        registry.register(Arc::new(Scripted::new("a"))).expect("a");
        let mut failing = Scripted::new("b");
        failing.fail = true;
        registry.register(Arc::new(failing)).expect("b");

        let mut set = registry.spawn_init_all();
        let mut ok = 0;
        while let Some(joined) = set.join_next().await {
            let (_, result) = joined.expect("task");
            if result.is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(cache.state("a"), HandlerState::Ready);
        assert_eq!(cache.state("b"), HandlerState::Failed);
    }
}
