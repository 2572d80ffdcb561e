//! `convgraph formats`

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use convgraph_core::catalog::FormatCatalog;
use convgraph_core::result::AppResult;
use convgraph_core::types::format::{Category, Format};

use crate::output::{self, OutputFormat};

/// Arguments for `formats`
#[derive(Debug, Args)]
pub struct FormatsArgs {
    /// Only formats in this category (image, video, audio, document, ...)
    #[arg(long)]
    pub category: Option<Category>,
}

#[derive(Debug, Serialize, Tabled)]
struct FormatRow {
    id: String,
    name: String,
    extension: String,
    mime: String,
    categories: String,
}

impl From<&Format> for FormatRow {
    fn from(format: &Format) -> Self {
        Self {
            id: format.id.clone(),
            name: format.name.clone(),
            extension: format.extension.clone(),
            mime: format.mime.clone(),
            categories: format
                .categories
                .iter()
                .map(Category::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Execute `formats`. Needs no handlers.
pub fn execute(args: &FormatsArgs, format: OutputFormat) -> AppResult<()> {
    let catalog = FormatCatalog::builtin();
    let formats: Vec<&Format> = match args.category {
        Some(category) => catalog.in_category(category),
        None => catalog.formats().iter().collect(),
    };
    let rows: Vec<FormatRow> = formats.into_iter().map(FormatRow::from).collect();
    output::print_list(&rows, format);
    Ok(())
}
