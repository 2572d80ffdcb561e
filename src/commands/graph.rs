//! `convgraph graph`

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use convgraph_core::config::AppConfig;
use convgraph_core::result::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for `graph`
#[derive(Debug, Args)]
pub struct GraphArgs {
    /// Print the raw graph as JSON regardless of --format
    #[arg(long)]
    pub json: bool,

    /// Also list every edge
    #[arg(long)]
    pub edges: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct NodeRow {
    node: String,
    handler: String,
    format: String,
    state: String,
    #[tabled(rename = "in")]
    from: bool,
    #[tabled(rename = "out")]
    to: bool,
    common: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct EdgeRow {
    from: String,
    to: String,
    handler: String,
    common: bool,
}

/// Execute `graph`
pub async fn execute(args: &GraphArgs, config: AppConfig, format: OutputFormat) -> AppResult<()> {
    let ctx = super::build_context(config).await?;
    let data = ctx.graph().data();

    if args.json || format == OutputFormat::Json {
        output::print_json(&data);
        return Ok(());
    }

    if !data.is_usable() {
        output::print_warning("The graph is empty: no handler reported any format");
        return Ok(());
    }

    let nodes: Vec<NodeRow> = data
        .nodes
        .iter()
        .map(|n| NodeRow {
            node: n.id.to_string(),
            handler: n.handler.clone(),
            format: n.format.clone(),
            state: n.state.to_string(),
            from: n.from,
            to: n.to,
            common: n.common,
        })
        .collect();
    output::print_list(&nodes, format);

    if args.edges {
        let edges: Vec<EdgeRow> = data
            .edges
            .iter()
            .map(|e| EdgeRow {
                from: e.from.to_string(),
                to: e.to.to_string(),
                handler: e.handler.clone(),
                common: e.common,
            })
            .collect();
        output::print_list(&edges, format);
    }

    output::print_kv("Nodes", &data.nodes.len().to_string());
    output::print_kv("Edges", &data.edges.len().to_string());
    output::print_kv("Generation", &data.generation.to_string());
    Ok(())
}
