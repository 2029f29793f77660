use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::error::{FitsUtilsError, Result};
use crate::fits::{read_header, HduSelector};

/// Write the header of HDU `ext` of `path` to `sink`, one record per line.
pub fn print_header<W: Write>(
    path: &Path,
    ext: &HduSelector,
    sink: &mut W,
    config: &Config,
) -> Result<()> {
    let header = read_header(path, ext, config)?;
    writeln!(sink, "{}", header).map_err(FitsUtilsError::Output)?;
    sink.flush().map_err(FitsUtilsError::Output)
}
