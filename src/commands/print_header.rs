use crate::config::Config;
use crate::fits::HduSelector;
use crate::printer::print_header;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

pub fn print_fits_header(
    fitsfile: &Path,
    extension: &str,
    outfile: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let ext = HduSelector::parse(Some(extension))?;

    let printed = match outfile {
        Some(outfile) => {
            let file = File::create(outfile)
                .map_err(|_| anyhow::anyhow!("ERROR: Cannot open {}", outfile.display()))?;
            let mut sink = BufWriter::new(file);
            print_header(fitsfile, &ext, &mut sink, config)
        }
        None => {
            let stdout = io::stdout();
            let mut sink = stdout.lock();
            print_header(fitsfile, &ext, &mut sink, config)
        }
    };
    printed.with_context(|| format!("Failed to print header {} of {}", ext, fitsfile.display()))
}
