//! `convgraph convert`

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use convgraph_core::config::AppConfig;
use convgraph_core::error::AppError;
use convgraph_core::result::AppResult;
use convgraph_core::traits::handler::ConvertOptions;
use convgraph_core::types::file::FileData;
use convgraph_graph::NodeSelector;

use crate::output::{self, OutputFormat};

/// Arguments for `convert`
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input file
    pub input: PathBuf,

    /// Target format (id, extension or MIME type)
    #[arg(short, long)]
    pub to: String,

    /// Source format; detected from the file extension when omitted
    #[arg(long)]
    pub from: Option<String>,

    /// Output directory (defaults to the input's directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Search the full graph instead of trying common formats first
    #[arg(long)]
    pub full: bool,

    /// Handler option as key=value; repeatable
    #[arg(long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ConvertReport {
    run_id: String,
    path: Vec<String>,
    mode: String,
    attempts: usize,
    duration_ms: u64,
    outputs: Vec<WrittenFile>,
}

#[derive(Debug, Serialize)]
struct WrittenFile {
    path: String,
    bytes: usize,
}

/// Execute `convert`
pub async fn execute(args: &ConvertArgs, mut config: AppConfig, format: OutputFormat) -> AppResult<()> {
    if args.full {
        config.search.simple_first = false;
    }
    let options = parse_options(&args.options)?;

    let ctx = super::build_context(config).await?;
    let catalog = ctx.catalog();

    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::validation(format!("'{}' is not a file", args.input.display())))?;

    let from = match &args.from {
        Some(query) => super::resolve_format(catalog, query)?,
        None => catalog.detect(&file_name).cloned().ok_or_else(|| {
            AppError::validation(format!(
                "Cannot detect the format of '{file_name}'; pass --from"
            ))
        })?,
    };
    let to = super::resolve_format(catalog, &args.to)?;

    let bytes = tokio::fs::read(&args.input).await?;
    info!(input = %args.input.display(), from = %from.id, to = %to.id, "Converting");
    let files = vec![FileData::new(file_name, bytes)];

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = ctx
        .traverser()
        .try_convert_with(
            files,
            &NodeSelector::from(&from),
            &NodeSelector::from(&to),
            &options,
            cancel,
        )
        .await?
        .ok_or_else(|| {
            AppError::no_path(format!("No conversion path from {} to {}", from.id, to.id))
        })?;

    let out_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    if !out_dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(&out_dir).await?;
    }

    let mut outputs = Vec::with_capacity(outcome.files.len());
    for file in &outcome.files {
        let target = out_dir.join(&file.name);
        tokio::fs::write(&target, &file.bytes).await?;
        outputs.push(WrittenFile {
            path: target.display().to_string(),
            bytes: file.len(),
        });
    }

    ctx.persist_cache().await?;
    debug!(metrics = ?ctx.metrics().snapshot(), "Conversion metrics");

    let report = ConvertReport {
        run_id: outcome.run_id.to_string(),
        path: outcome.path.nodes().iter().map(ToString::to_string).collect(),
        mode: outcome.mode.to_string(),
        attempts: outcome.attempts,
        duration_ms: outcome.duration.as_millis() as u64,
        outputs,
    };

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_success(&format!("Converted {} → {}", from.id, to.id));
            output::print_kv("Path", &outcome.path.to_string());
            output::print_kv("Attempts", &report.attempts.to_string());
            output::print_kv("Duration", &format!("{} ms", report.duration_ms));
            for written in &report.outputs {
                output::print_kv("Wrote", &format!("{} ({} bytes)", written.path, written.bytes));
            }
        }
    }
    Ok(())
}

/// Parse `key=value` pairs; values are read as JSON when possible.
fn parse_options(raw: &[String]) -> AppResult<ConvertOptions> {
    raw.iter().try_fold(ConvertOptions::new(), |options, pair| {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| AppError::validation(format!("Option '{pair}' is not KEY=VALUE")))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        Ok(options.with(key.trim(), value))
    })
}
