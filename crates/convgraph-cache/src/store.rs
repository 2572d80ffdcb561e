//! In-process capability cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use convgraph_core::error::AppError;
use convgraph_core::result::AppResult;
use convgraph_core::traits::handler::HandlerState;
use convgraph_core::types::capability::SupportedFormat;

use crate::entry::CapabilityEntry;
use crate::export::{CapabilityExport, EXPORT_VERSION, HandlerCapabilities};

#[derive(Debug, Default)]
struct CacheState {
    /// Handler names in registration order.
    order: Vec<String>,
    /// Handler name → current entry. Entries are replaced, never mutated.
    entries: HashMap<String, Arc<CapabilityEntry>>,
}

impl CacheState {
    /// Copy-on-write update of one entry, creating it if absent.
    fn update(&mut self, handler: &str, f: impl FnOnce(&mut CapabilityEntry)) {
        let mut entry = match self.entries.get(handler) {
            Some(existing) => CapabilityEntry::clone(existing),
            None => {
                self.order.push(handler.to_string());
                CapabilityEntry::new(handler, self.order.len() - 1)
            }
        };
        f(&mut entry);
        entry.updated_at = Utc::now();
        self.entries.insert(handler.to_string(), Arc::new(entry));
    }
}

/// Process-wide record of handler capabilities and lifecycle states.
///
/// Shared behind an `Arc` by the graph, the search engine, and the handler
/// registry. All updates are immediately visible to subsequent reads.
#[derive(Debug, Default)]
pub struct CapabilityCache {
    state: RwLock<CacheState>,
    /// Bumped on every mutation.
    generation: AtomicU64,
}

impl CapabilityCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Set or replace the supported formats for a handler.
    ///
    /// Idempotent. The handler keeps its original registration ordinal and
    /// lifecycle state.
    pub fn register(&self, handler: &str, formats: Vec<SupportedFormat>) {
        let count = formats.len();
        self.write().update(handler, |entry| entry.formats = formats);
        self.bump();
        debug!(handler, formats = count, "Capabilities registered");
    }

    /// Supported formats for a handler; empty when unknown.
    pub fn get(&self, handler: &str) -> Vec<SupportedFormat> {
        self.read()
            .entries
            .get(handler)
            .map(|entry| entry.formats.clone())
            .unwrap_or_default()
    }

    /// Full entry for a handler.
    pub fn entry(&self, handler: &str) -> Option<Arc<CapabilityEntry>> {
        self.read().entries.get(handler).cloned()
    }

    /// Lifecycle state of a handler. Unknown handlers are `Unregistered`.
    pub fn state(&self, handler: &str) -> HandlerState {
        self.read()
            .entries
            .get(handler)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Record a lifecycle transition.
    pub fn set_state(&self, handler: &str, state: HandlerState) {
        self.write().update(handler, |entry| {
            entry.state = state;
            if state != HandlerState::Failed {
                entry.failure = None;
            }
        });
        self.bump();
        debug!(handler, state = %state, "Handler state changed");
    }

    /// Mark a handler failed. Its entry is kept for diagnostics.
    pub fn mark_failed(&self, handler: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(handler, reason = %reason, "Handler marked failed");
        self.write().update(handler, |entry| {
            entry.state = HandlerState::Failed;
            entry.failure = Some(reason);
        });
        self.bump();
    }

    /// Consistent point-in-time view of every entry, in registration order.
    pub fn snapshot(&self) -> CapabilitySnapshot {
        let state = self.read();
        let entries = state
            .order
            .iter()
            .filter_map(|name| state.entries.get(name).cloned())
            .collect();
        CapabilitySnapshot {
            generation: self.generation.load(Ordering::SeqCst),
            entries,
        }
    }

    /// Handler names in registration order.
    pub fn handler_names(&self) -> Vec<String> {
        self.read().order.clone()
    }

    /// Number of handlers with an entry.
    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    /// Whether the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.read().order.is_empty()
    }

    /// Mutation counter. Changes whenever any entry changes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Export handler capabilities for pre-populating a later session.
    ///
    /// Handlers with no known formats are omitted.
    pub fn export(&self) -> CapabilityExport {
        let handlers = self
            .snapshot()
            .entries
            .iter()
            .filter(|entry| !entry.formats.is_empty())
            .map(|entry| HandlerCapabilities {
                name: entry.handler.clone(),
                formats: entry.formats.clone(),
            })
            .collect();
        CapabilityExport {
            version: EXPORT_VERSION,
            generated_at: Utc::now(),
            handlers,
        }
    }

    /// Export as pretty-printed JSON.
    pub fn export_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Pre-populate from an export.
    ///
    /// Only fills handlers whose formats are not yet known, so live
    /// discovery always wins over stale exported data. Returns the number of
    /// handlers filled.
    pub fn import(&self, export: &CapabilityExport) -> usize {
        if export.version != EXPORT_VERSION {
            warn!(
                version = export.version,
                expected = EXPORT_VERSION,
                "Importing capability export with a different schema version"
            );
        }

        let mut filled = 0;
        {
            let mut state = self.write();
            for handler in &export.handlers {
                let known = state
                    .entries
                    .get(&handler.name)
                    .map(|entry| !entry.formats.is_empty())
                    .unwrap_or(false);
                if known {
                    continue;
                }
                let formats = handler.formats.clone();
                state.update(&handler.name, |entry| entry.formats = formats);
                filled += 1;
            }
        }
        if filled > 0 {
            self.bump();
        }
        info!(handlers = filled, "Capability cache pre-populated");
        filled
    }

    /// Build a cache from exported JSON.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let export: CapabilityExport = serde_json::from_str(json)?;
        let cache = Self::new();
        cache.import(&export);
        Ok(cache)
    }

    /// Import an export file into this cache.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> AppResult<usize> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::with_source(
                convgraph_core::error::ErrorKind::Storage,
                format!("Failed to read capability cache '{}'", path.display()),
                e,
            )
        })?;
        let export: CapabilityExport = serde_json::from_str(&json)?;
        Ok(self.import(&export))
    }

    /// Write the current export to a file, creating parent directories.
    pub async fn save_file(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, self.export_json()?).await?;
        info!(path = %path.display(), "Capability cache written");
        Ok(())
    }
}

/// A consistent view of the cache at one instant.
#[derive(Debug, Clone)]
pub struct CapabilitySnapshot {
    generation: u64,
    entries: Vec<Arc<CapabilityEntry>>,
}

impl CapabilitySnapshot {
    /// Cache generation the snapshot was taken at.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[Arc<CapabilityEntry>] {
        &self.entries
    }

    /// Entry for one handler.
    pub fn get(&self, handler: &str) -> Option<&Arc<CapabilityEntry>> {
        self.entries.iter().find(|entry| entry.handler == handler)
    }

    /// Whether the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
