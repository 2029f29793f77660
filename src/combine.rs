use std::path::{Path, PathBuf};

use fitsio::FitsFile;
use tracing::{info, warn};

use crate::config::{Config, TRACE_CLOSE_LEVEL, TRACE_HDU_LEVEL};
use crate::debug_print;
use crate::error::{FitsUtilsError, Result};
use crate::fits::{move_to_index, open_readonly};
use crate::writer::FitsWriter;

/// HDUs taken from each input catalog (primary, LDAC_IMHEAD, LDAC_OBJECTS)
pub const HDUS_PER_CATALOG: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineReport {
    pub output: PathBuf,
    pub hdus_written: usize,
    /// An older file at the output path was deleted first
    pub replaced_existing: bool,
}

/// Combine all input catalogs (each with 3 HDUs) into a single FITS file.
///
/// Every input is opened and checked for its third HDU before an existing
/// `output` is deleted, so a bad input leaves the old output untouched. A
/// failure while copying deletes the partial output.
pub fn combine_cats(inputs: &[PathBuf], output: &Path, config: &Config) -> Result<CombineReport> {
    if inputs.is_empty() {
        return Err(FitsUtilsError::Config(
            "must provide input catalog names".to_string(),
        ));
    }

    debug_print!(
        config,
        TRACE_HDU_LEVEL,
        "Constructing single fits file {}",
        output.display()
    );
    let mut catalogs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut catalog = open_readonly(input)?;
        move_to_index(&mut catalog, HDUS_PER_CATALOG - 1)?;
        catalogs.push(catalog);
    }

    let replaced_existing = output.exists();
    if replaced_existing {
        std::fs::remove_file(output).map_err(|e| FitsUtilsError::io(output, e))?;
        info!(
            "Removing pre-existing version of fullcat {}",
            output.display()
        );
    }

    let mut writer = FitsWriter::create(output)?;
    if let Err(err) = append_catalogs(&mut writer, inputs, &mut catalogs, config) {
        if let Err(discard_err) = writer.discard() {
            warn!(
                "Could not delete partial fullcat {}: {}",
                output.display(),
                discard_err
            );
        }
        return Err(err);
    }

    let hdus_written = writer.num_hdus()?;
    debug_print!(
        config,
        TRACE_HDU_LEVEL,
        "Writing results to fullcat --> {}",
        output.display()
    );
    debug_print!(
        config,
        TRACE_CLOSE_LEVEL,
        "Using fits_close to close fullcat --> {}",
        output.display()
    );
    writer.close()?;

    Ok(CombineReport {
        output: output.to_path_buf(),
        hdus_written,
        replaced_existing,
    })
}

fn append_catalogs(
    writer: &mut FitsWriter,
    inputs: &[PathBuf],
    catalogs: &mut [FitsFile],
    config: &Config,
) -> Result<()> {
    for (input, catalog) in inputs.iter().zip(catalogs.iter_mut()) {
        debug_print!(
            config,
            TRACE_HDU_LEVEL,
            "Appending {} HDUs from cat --> {}",
            HDUS_PER_CATALOG,
            input.display()
        );
        for index in 0..HDUS_PER_CATALOG {
            writer.copy_hdu(catalog, index)?;
        }
    }
    Ok(())
}
