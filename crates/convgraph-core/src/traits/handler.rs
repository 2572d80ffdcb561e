//! The conversion handler contract.
//!
//! A handler wraps one codec or library and performs the actual byte
//! transformation. The graph and the execution engine never look past this
//! trait.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;
use crate::types::capability::SupportedFormat;
use crate::types::file::FileData;
use crate::types::format::Format;

/// Lifecycle of a handler within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerState {
    /// Initialization has not been attempted in this process. Capabilities,
    /// if known, come from a preloaded capability cache.
    #[default]
    Unregistered,
    /// `init()` is in flight.
    Initializing,
    /// `init()` completed; the handler may be invoked.
    Ready,
    /// `init()` failed. Every edge through this handler is treated as absent.
    Failed,
}

impl HandlerState {
    /// Whether edges through a handler in this state may appear in searches.
    pub fn is_traversable(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unregistered => write!(f, "unregistered"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Errors reported by a handler.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The handler could not become ready.
    #[error("Initialization failed: {0}")]
    Init(String),

    /// The handler was asked for a pair it does not support.
    #[error("Unsupported conversion: {from} → {to}")]
    Unsupported {
        /// Input format id.
        from: String,
        /// Output format id.
        to: String,
    },

    /// Input bytes could not be decoded.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Output bytes could not be produced.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl From<HandlerError> for AppError {
    fn from(err: HandlerError) -> Self {
        match &err {
            HandlerError::Init(_) => AppError::handler(err.to_string()),
            _ => AppError::conversion(err.to_string()),
        }
    }
}

/// Free-form options forwarded to every step of a conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvertOptions {
    params: BTreeMap<String, serde_json::Value>,
}

impl ConvertOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get an option by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    /// Get an unsigned integer option by key.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(|v| v.as_u64())
    }
}

/// A stateful capability provider.
///
/// Handlers may know their formats up front (`declared_formats`) or only
/// after `init` completes, in which case `init` returns the discovered set.
#[async_trait]
pub trait Handler: Send + Sync + fmt::Debug + 'static {
    /// Unique handler name. Used as the key in the capability cache.
    fn name(&self) -> &str;

    /// Whether `init` has completed successfully.
    fn is_ready(&self) -> bool;

    /// Formats known without initialization. Empty for handlers whose
    /// capabilities are discovered.
    fn declared_formats(&self) -> Vec<SupportedFormat> {
        Vec::new()
    }

    /// Load the backing module and report the supported formats.
    ///
    /// Called at most once per process by the handler registry.
    async fn init(&self) -> Result<Vec<SupportedFormat>, HandlerError>;

    /// Convert `files` from `input` to `output`.
    async fn convert(
        &self,
        files: Vec<FileData>,
        input: &Format,
        output: &Format,
        options: &ConvertOptions,
    ) -> Result<Vec<FileData>, HandlerError>;
}
