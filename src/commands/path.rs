//! `convgraph path`

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use convgraph_core::config::AppConfig;
use convgraph_core::result::AppResult;
use convgraph_graph::{NodeSelector, SearchMode};

use crate::output::{self, OutputFormat};

/// Arguments for `path`
#[derive(Debug, Args)]
pub struct PathArgs {
    /// Source format (id, extension or MIME type)
    pub from: String,

    /// Target format (id, extension or MIME type)
    pub to: String,

    /// Search the full graph instead of common formats only
    #[arg(long)]
    pub full: bool,

    /// Maximum number of paths to list
    #[arg(short, long, default_value = "5")]
    pub limit: usize,
}

#[derive(Debug, Serialize, Tabled)]
struct PathRow {
    rank: usize,
    steps: usize,
    path: String,
}

/// Execute `path`. Lists paths in search order without converting anything.
pub async fn execute(args: &PathArgs, config: AppConfig, format: OutputFormat) -> AppResult<()> {
    let ctx = super::build_context(config).await?;
    let from = super::resolve_format(ctx.catalog(), &args.from)?;
    let to = super::resolve_format(ctx.catalog(), &args.to)?;
    let mode = SearchMode::from_simple(!args.full);

    let rows: Vec<PathRow> = ctx
        .graph()
        .search_path(&NodeSelector::from(&from), &NodeSelector::from(&to), mode)
        .take(args.limit)
        .enumerate()
        .map(|(i, path)| PathRow {
            rank: i + 1,
            steps: path.steps(),
            path: path.to_string(),
        })
        .collect();

    if rows.is_empty() && format == OutputFormat::Table && mode.is_simple() {
        output::print_warning(&format!(
            "No {mode} path from {} to {}; try --full",
            from.id, to.id
        ));
        return Ok(());
    }
    output::print_list(&rows, format);
    Ok(())
}
