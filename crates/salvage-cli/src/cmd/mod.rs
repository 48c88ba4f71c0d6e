pub mod completions;
pub mod plan;
pub mod run;

use anyhow::{Context, Result};
use salvage_core::RunConfig;
use salvage_core::oracle::TemplateCatalog;

/// Load the template table named by `config`, with its blacklist applied.
pub fn load_catalog(config: &RunConfig) -> Result<TemplateCatalog> {
    let blacklist = config.gift.blacklist.iter().cloned().collect();
    let catalog = TemplateCatalog::load(&config.paths.templates, blacklist)
        .context("loading the item template table")?;
    tracing::info!(templates = catalog.len(), "template table loaded");
    Ok(catalog)
}
