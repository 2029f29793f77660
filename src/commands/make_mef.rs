use crate::config::Config;
use crate::mef::{MefBuilder, MefOutcome};
use crate::utils::resolve_path_list;
use anyhow::{Context, Result};
use std::path::Path;

pub fn make_mef(
    outname: &Path,
    filenames: Option<&str>,
    list: Option<&Path>,
    clobber: bool,
    extnames: Option<&str>,
    config: &Config,
) -> Result<()> {
    let inputs = resolve_path_list(filenames, list)?;
    let mut builder = MefBuilder::new()
        .filenames(inputs)
        .outname(outname)
        .clobber(clobber);
    if let Some(extnames) = extnames {
        let names = extnames
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty());
        builder = builder.extnames(names);
    }

    match builder
        .build(config)
        .with_context(|| format!("Failed to build {}", outname.display()))?
    {
        MefOutcome::Written { path, hdus } => {
            println!("Wrote {} HDUs to {}", hdus, path.display());
        }
        MefOutcome::Skipped { path } => {
            println!("Skipped {}: output exists", path.display());
        }
    }
    Ok(())
}
