//! `convgraph handlers`

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use convgraph_core::config::AppConfig;
use convgraph_core::result::AppResult;
use convgraph_engine::HandlerInfo;

use crate::output::{self, OutputFormat};

/// Arguments for `handlers`
#[derive(Debug, Args)]
pub struct HandlersArgs {
    /// Initialize every handler before listing, not only undiscovered ones
    #[arg(long)]
    pub init: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct HandlerRow {
    name: String,
    state: String,
    inputs: usize,
    outputs: usize,
    common: usize,
    failure: String,
}

impl From<HandlerInfo> for HandlerRow {
    fn from(info: HandlerInfo) -> Self {
        Self {
            name: info.name,
            state: info.state.to_string(),
            inputs: info.inputs,
            outputs: info.outputs,
            common: info.common,
            failure: info.failure.unwrap_or_default(),
        }
    }
}

/// Execute `handlers`
pub async fn execute(args: &HandlersArgs, config: AppConfig, format: OutputFormat) -> AppResult<()> {
    let ctx = super::build_context(config).await?;
    if args.init {
        for (name, result) in ctx.registry().init_all().await {
            if let Err(e) = result {
                warn!(handler = %name, error = %e, "Handler unavailable");
            }
        }
        ctx.persist_cache().await?;
    }
    let info = ctx.registry().describe();
    match format {
        OutputFormat::Json => output::print_json(&info),
        OutputFormat::Table => {
            let rows: Vec<HandlerRow> = info.into_iter().map(HandlerRow::from).collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
