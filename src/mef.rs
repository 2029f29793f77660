//! Assembly of a multi-extension FITS file from single-image files.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::{Config, TRACE_CLOSE_LEVEL, TRACE_HDU_LEVEL};
use crate::debug_print;
use crate::error::{FitsUtilsError, Result};
use crate::fits::open_readonly;
use crate::writer::FitsWriter;

/// DESDM names for the usual image planes
pub fn des_ext(extname: &str) -> Option<&'static str> {
    match extname {
        "SCI" => Some("IMAGE"),
        "WGT" => Some("WEIGHT"),
        "MSK" => Some("MASK"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MefOutcome {
    Written { path: PathBuf, hdus: usize },
    /// The output already existed and clobbering was not requested
    Skipped { path: PathBuf },
}

#[derive(Debug, Clone, Default)]
pub struct MefBuilder {
    filenames: Vec<PathBuf>,
    outname: Option<PathBuf>,
    clobber: bool,
    extnames: Option<Vec<String>>,
}

impl MefBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filenames<I, P>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.filenames = filenames.into_iter().map(Into::into).collect();
        self
    }

    pub fn outname(mut self, outname: impl Into<PathBuf>) -> Self {
        self.outname = Some(outname.into());
        self
    }

    pub fn clobber(mut self, clobber: bool) -> Self {
        self.clobber = clobber;
        self
    }

    pub fn extnames<I, S>(mut self, extnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extnames = Some(extnames.into_iter().map(Into::into).collect());
        self
    }

    /// Write the primary HDU of every input, in order, as one file.
    pub fn build(&self, config: &Config) -> Result<MefOutcome> {
        if self.filenames.is_empty() {
            return Err(FitsUtilsError::Config(
                "must provide input file names".to_string(),
            ));
        }
        let outname = self
            .outname
            .as_deref()
            .ok_or_else(|| FitsUtilsError::Config("must provide output file name".to_string()))?;

        if let Some(extnames) = &self.extnames {
            if extnames.len() != self.filenames.len() {
                return Err(FitsUtilsError::Config(format!(
                    "number of extension names ({}) doesn't match filenames ({})",
                    extnames.len(),
                    self.filenames.len()
                )));
            }
        }

        if outname.exists() {
            if !self.clobber {
                warn!(
                    "Output file {} exists, try --clobber option, no file was created",
                    outname.display()
                );
                return Ok(MefOutcome::Skipped {
                    path: outname.to_path_buf(),
                });
            }
            std::fs::remove_file(outname).map_err(|e| FitsUtilsError::io(outname, e))?;
        }

        let hdus = self.write(outname, config)?;
        Ok(MefOutcome::Written {
            path: outname.to_path_buf(),
            hdus,
        })
    }

    fn write(&self, outname: &Path, config: &Config) -> Result<usize> {
        let mut writer = FitsWriter::create(outname)?;
        if let Err(err) = self.fill(&mut writer, config) {
            if let Err(discard_err) = writer.discard() {
                warn!("Could not delete partial {}: {}", outname.display(), discard_err);
            }
            return Err(err);
        }

        let hdus = writer.num_hdus()?;
        debug_print!(config, TRACE_HDU_LEVEL, "Writing to: {}", outname.display());
        debug_print!(
            config,
            TRACE_CLOSE_LEVEL,
            "Using fits_close to close {}",
            outname.display()
        );
        writer.close()?;
        Ok(hdus)
    }

    fn fill(&self, writer: &mut FitsWriter, config: &Config) -> Result<()> {
        for (k, fname) in self.filenames.iter().enumerate() {
            debug_print!(config, TRACE_HDU_LEVEL, "Reading {} --> HDU {}", fname.display(), k);
            let mut src = open_readonly(fname)?;
            writer.copy_hdu(&mut src, 0)?;
        }

        if let Some(extnames) = &self.extnames {
            for (k, extname) in extnames.iter().enumerate() {
                debug_print!(config, TRACE_HDU_LEVEL, "Adding EXTNAME={} to HDU {}", extname, k);
                writer.update_string_key(k, "EXTNAME", extname, Some("Extension Name"))?;
                if let Some(des) = des_ext(extname) {
                    writer.update_string_key(k, "DES_EXT", des, Some("DESDM Extension Name"))?;
                }
            }
        }
        Ok(())
    }
}
