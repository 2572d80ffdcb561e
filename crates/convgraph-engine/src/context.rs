//! Wiring of catalog, cache, graph, registry and configuration.

use std::sync::Arc;

use tracing::{debug, info};

use convgraph_cache::CapabilityCache;
use convgraph_core::catalog::FormatCatalog;
use convgraph_core::config::AppConfig;
use convgraph_core::result::AppResult;
use convgraph_core::traits::handler::Handler;
use convgraph_graph::ConversionGraph;

use crate::executor::PathExecutor;
use crate::metrics::ConversionMetrics;
use crate::registry::HandlerRegistry;
use crate::traversal::Traverser;

/// Everything a conversion session shares.
///
/// Cheap to clone; all parts are reference counted.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    config: Arc<AppConfig>,
    catalog: Arc<FormatCatalog>,
    cache: Arc<CapabilityCache>,
    graph: Arc<ConversionGraph>,
    registry: Arc<HandlerRegistry>,
    metrics: Arc<ConversionMetrics>,
}

impl ConversionContext {
    /// Context over the built-in format catalog.
    pub fn new(config: AppConfig) -> Self {
        Self::with_catalog(config, FormatCatalog::builtin())
    }

    /// Context over a caller-supplied catalog.
    pub fn with_catalog(config: AppConfig, catalog: FormatCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let cache = Arc::new(CapabilityCache::new());
        let metrics = Arc::new(ConversionMetrics::new());
        let graph = Arc::new(
            ConversionGraph::new(Arc::clone(&catalog), Arc::clone(&cache))
                .with_max_depth(config.search.max_depth),
        );
        let registry = Arc::new(HandlerRegistry::new(
            Arc::clone(&cache),
            config.execution.init_timeout(),
            Arc::clone(&metrics),
        ));

        Self {
            config: Arc::new(config),
            catalog,
            cache,
            graph,
            registry,
            metrics,
        }
    }

    /// Register a handler. Registration order is the graph's tie-break order.
    pub fn register(&self, handler: Arc<dyn Handler>) -> AppResult<()> {
        self.registry.register(handler)
    }

    /// Register handlers in iteration order, stopping at the first error.
    pub fn register_all(
        &self,
        handlers: impl IntoIterator<Item = Arc<dyn Handler>>,
    ) -> AppResult<()> {
        for handler in handlers {
            self.register(handler)?;
        }
        Ok(())
    }

    /// A traverser bound to this context.
    pub fn traverser(&self) -> Traverser {
        let executor = PathExecutor::new(
            Arc::clone(&self.registry),
            self.config.execution.clone(),
            Arc::clone(&self.metrics),
        );
        Traverser::new(
            Arc::clone(&self.graph),
            executor,
            self.config.search.clone(),
            Arc::clone(&self.metrics),
        )
    }

    /// Pre-populate the cache from `cache.path`, if configured and present.
    ///
    /// Call after registering handlers so registration order stays the
    /// tie-break order. Returns the number of handlers filled.
    pub async fn load_cache(&self) -> AppResult<usize> {
        let Some(path) = self.config.cache.path.as_deref() else {
            return Ok(0);
        };
        if !tokio::fs::try_exists(path).await? {
            debug!(path, "No capability cache file yet");
            return Ok(0);
        }
        let filled = self.cache.load_file(path).await?;
        info!(path, handlers = filled, "Capability cache loaded");
        Ok(filled)
    }

    /// Write the cache back to `cache.path` when `cache.write_back` is set.
    pub async fn persist_cache(&self) -> AppResult<bool> {
        match self.config.cache.path.as_deref() {
            Some(path) if self.config.cache.write_back => {
                self.cache.save_file(path).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Format catalog shared by graph and handlers.
    pub fn catalog(&self) -> &Arc<FormatCatalog> {
        &self.catalog
    }

    /// Live capability cache.
    pub fn cache(&self) -> &Arc<CapabilityCache> {
        &self.cache
    }

    /// Conversion graph over the cache.
    pub fn graph(&self) -> &Arc<ConversionGraph> {
        &self.graph
    }

    /// Handler registry.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Metrics shared by every traverser of this context.
    pub fn metrics(&self) -> &Arc<ConversionMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use convgraph_core::config::cache::CacheConfig;
    use convgraph_core::types::capability::SupportedFormat;

    use super::*;

    fn config_with_cache(path: &std::path::Path, write_back: bool) -> AppConfig {
        AppConfig {
            cache: CacheConfig {
                path: Some(path.to_string_lossy().into_owned()),
                write_back,
            },
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_cache_file_is_fine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = ConversionContext::new(config_with_cache(&dir.path().join("caps.json"), false));
        assert_eq!(ctx.load_cache().await.expect("load"), 0);
        assert!(!ctx.persist_cache().await.expect("persist"));
    }

    #[tokio::test]
    async fn test_cache_round_trip_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("caps.json");

        let writer = ConversionContext::new(config_with_cache(&path, true));
        let png = writer.catalog().get("png").cloned().expect("png");
        writer.cache().register("raster", vec![SupportedFormat::both(png)]);
        assert!(writer.persist_cache().await.expect("persist"));

        let reader = ConversionContext::new(config_with_cache(&path, false));
        assert_eq!(reader.load_cache().await.expect("load"), 1);
        assert_eq!(reader.cache().get("raster").len(), 1);
    }

    #[test]
    fn test_graph_depth_follows_config() {
        let mut config = AppConfig::default();
        config.search.max_depth = 3;
        let ctx = ConversionContext::new(config);
        assert_eq!(ctx.graph().max_depth(), 3);
        assert!(ctx.registry().is_empty());
    }
}
