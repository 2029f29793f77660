use crate::config::Config;
use crate::scamp::split_scamp_head;
use crate::utils::resolve_path_list;
use anyhow::{Context, Result};
use std::path::Path;

pub fn split_head_file(
    input: &Path,
    out: Option<&str>,
    list: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let outputs = resolve_path_list(out, list)?;
    let report = split_scamp_head(input, &outputs, config)
        .with_context(|| format!("Failed to split {}", input.display()))?;

    for segment in &report.segments {
        println!("{:<60} {:>6} lines", segment.path.display(), segment.lines);
    }
    println!(
        "Wrote {} head files ({} lines)",
        report.segments.len(),
        report.lines_written()
    );
    Ok(())
}
