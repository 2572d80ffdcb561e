//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use convgraph_core::catalog::FormatCatalog;
use convgraph_core::config::AppConfig;
use convgraph_core::traits::handler::{ConvertOptions, Handler, HandlerError};
use convgraph_core::types::capability::SupportedFormat;
use convgraph_core::types::file::FileData;
use convgraph_core::types::format::Format;
use convgraph_engine::ConversionContext;

/// How a fake handler behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Rename each file and append the output id to its bytes.
    Pass,
    /// Fail every conversion.
    FailConvert,
    /// Fail initialization.
    FailInit,
}

/// A scripted handler over catalog formats.
#[derive(Debug)]
pub struct FakeHandler {
    name: String,
    formats: Vec<SupportedFormat>,
    behavior: Behavior,
    declare: bool,
    pub init_calls: AtomicUsize,
    pub convert_calls: AtomicUsize,
}

impl FakeHandler {
    /// Handler reading and writing every listed format.
    pub fn new(name: &str, ids: &[&str], behavior: Behavior) -> Self {
        let catalog = FormatCatalog::builtin();
        let formats = ids
            .iter()
            .map(|id| SupportedFormat::both(catalog.get(id).cloned().expect("catalog format")))
            .collect();
        Self {
            name: name.to_string(),
            formats,
            behavior,
            declare: true,
            init_calls: AtomicUsize::new(0),
            convert_calls: AtomicUsize::new(0),
        }
    }

    /// Mark every record common.
    pub fn common(mut self) -> Self {
        self.formats = self.formats.into_iter().map(SupportedFormat::common).collect();
        self
    }

    /// Only report formats from `init`.
    pub fn discovered(mut self) -> Self {
        self.declare = false;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn converts(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for FakeHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn declared_formats(&self) -> Vec<SupportedFormat> {
        if self.declare {
            self.formats.clone()
        } else {
            Vec::new()
        }
    }

    async fn init(&self) -> Result<Vec<SupportedFormat>, HandlerError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailInit {
            return Err(HandlerError::Init(format!("{} cannot start", self.name)));
        }
        Ok(self.formats.clone())
    }

    async fn convert(
        &self,
        files: Vec<FileData>,
        _input: &Format,
        output: &Format,
        _options: &ConvertOptions,
    ) -> Result<Vec<FileData>, HandlerError> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailConvert {
            return Err(HandlerError::Other(format!("{} refused", self.name)));
        }
        Ok(files
            .into_iter()
            .map(|file| {
                let mut bytes = file.bytes.to_vec();
                bytes.extend_from_slice(output.id.as_bytes());
                FileData::new(file.renamed(&output.extension), bytes)
            })
            .collect())
    }
}

/// Context with `handlers` registered in order, full search only.
pub fn context(handlers: &[Arc<FakeHandler>]) -> ConversionContext {
    let mut config = AppConfig::default();
    config.search.simple_first = false;
    let ctx = ConversionContext::new(config);
    for handler in handlers {
        ctx.register(handler.clone()).expect("register");
    }
    ctx
}

pub fn input(name: &str) -> Vec<FileData> {
    vec![FileData::new(name, b"payload".to_vec())]
}
