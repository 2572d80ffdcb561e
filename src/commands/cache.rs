//! `convgraph cache`

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use convgraph_core::config::AppConfig;
use convgraph_core::result::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for cache commands
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Cache subcommand
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache subcommands
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Write discovered capabilities to a JSON file for later pre-population
    Export {
        /// Destination file
        file: PathBuf,
    },
    /// Show cached capabilities
    Show,
}

#[derive(Debug, Serialize, Tabled)]
struct CapabilityRow {
    handler: String,
    format: String,
    #[tabled(rename = "in")]
    from: bool,
    #[tabled(rename = "out")]
    to: bool,
    common: bool,
}

/// Execute cache commands
pub async fn execute(args: &CacheArgs, config: AppConfig, format: OutputFormat) -> AppResult<()> {
    let ctx = super::build_context(config).await?;

    match &args.command {
        CacheCommand::Export { file } => {
            ctx.cache().save_file(file).await?;
            output::print_success(&format!(
                "Exported {} handler(s) to {}",
                ctx.cache().export().handlers.len(),
                file.display()
            ));
        }
        CacheCommand::Show => {
            let export = ctx.cache().export();
            match format {
                OutputFormat::Json => output::print_json(&export),
                OutputFormat::Table => {
                    let rows: Vec<CapabilityRow> = export
                        .handlers
                        .iter()
                        .flat_map(|h| {
                            h.formats.iter().map(move |f| CapabilityRow {
                                handler: h.name.clone(),
                                format: f.id().to_string(),
                                from: f.from,
                                to: f.to,
                                common: f.common,
                            })
                        })
                        .collect();
                    output::print_list(&rows, format);
                }
            }
        }
    }
    Ok(())
}
