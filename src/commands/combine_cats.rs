use crate::combine::combine_cats;
use crate::config::Config;
use crate::utils::resolve_path_list;
use anyhow::{Context, Result};
use std::path::Path;

pub fn combine_catalogs(
    outcat: &Path,
    incats: Option<&str>,
    list: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let inputs = resolve_path_list(incats, list)?;
    let report = combine_cats(&inputs, outcat, config)
        .with_context(|| format!("Failed to combine catalogs into {}", outcat.display()))?;

    println!(
        "Combined {} catalogs ({} HDUs) into {}",
        inputs.len(),
        report.hdus_written,
        report.output.display()
    );
    Ok(())
}
