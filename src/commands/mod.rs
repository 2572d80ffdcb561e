//! CLI command definitions and dispatch.

pub mod cache;
pub mod convert;
pub mod formats;
pub mod graph;
pub mod handlers;
pub mod path;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;

use convgraph_core::catalog::FormatCatalog;
use convgraph_core::config::AppConfig;
use convgraph_core::error::AppError;
use convgraph_core::result::AppResult;
use convgraph_core::traits::handler::Handler;
use convgraph_core::types::format::Format;
use convgraph_engine::ConversionContext;
use plugin_raster::RasterHandler;
use plugin_svg::SvgEmbedHandler;

use crate::output::OutputFormat;

/// convgraph — convert files by chaining format handlers
#[derive(Debug, Parser)]
#[command(name = "convgraph", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a file to another format
    Convert(convert::ConvertArgs),
    /// List known formats
    Formats(formats::FormatsArgs),
    /// List handlers and their state
    Handlers(handlers::HandlersArgs),
    /// Show the conversion graph
    Graph(graph::GraphArgs),
    /// List conversion paths between two formats
    Path(path::PathArgs),
    /// Capability cache management
    Cache(cache::CacheArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Convert(args) => convert::execute(args, config, self.format).await,
            Commands::Formats(args) => formats::execute(args, self.format),
            Commands::Handlers(args) => handlers::execute(args, config, self.format).await,
            Commands::Graph(args) => graph::execute(args, config, self.format).await,
            Commands::Path(args) => path::execute(args, config, self.format).await,
            Commands::Cache(args) => cache::execute(args, config, self.format).await,
        }
    }
}

/// Load configuration from file, the `CONVGRAPH_ENV` overlay and environment.
pub fn load_config(config_path: &str) -> AppResult<AppConfig> {
    let env = std::env::var("CONVGRAPH_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(config_path, &env)
}

/// Build a context with the bundled handlers registered and discovered.
pub async fn build_context(config: AppConfig) -> AppResult<ConversionContext> {
    let ctx = ConversionContext::new(config);
    let catalog = Arc::clone(ctx.catalog());

    ctx.register_all([
        Arc::new(RasterHandler::new(Arc::clone(&catalog))) as Arc<dyn Handler>,
        Arc::new(SvgEmbedHandler::new(catalog)),
    ])?;

    ctx.load_cache().await?;
    for (name, result) in ctx.registry().init_undiscovered().await {
        if let Err(e) = result {
            warn!(handler = %name, error = %e, "Handler unavailable");
        }
    }
    Ok(ctx)
}

/// Look up a format by id, MIME type or extension.
pub fn resolve_format(catalog: &FormatCatalog, query: &str) -> AppResult<Format> {
    catalog
        .resolve(query)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("Unknown format '{query}'")))
}
