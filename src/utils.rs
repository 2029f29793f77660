use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{FitsUtilsError, Result};

fn comma_re() -> &'static Regex {
    static COMMA: OnceLock<Regex> = OnceLock::new();
    COMMA.get_or_init(|| Regex::new(r"\s*,\s*").expect("valid regex"))
}

/// Split a comma separated list of paths, ignoring blanks around commas.
pub fn parse_path_list(list: &str) -> Vec<PathBuf> {
    comma_re()
        .split(list.trim())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Read a list file: one path per line, blank lines skipped.
pub fn read_path_list_file(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = std::fs::read_to_string(path).map_err(|e| FitsUtilsError::io(path, e))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Paths from either a comma separated list or a list file.
pub fn resolve_path_list(list: Option<&str>, list_file: Option<&Path>) -> Result<Vec<PathBuf>> {
    match (list, list_file) {
        (Some(list), None) => Ok(parse_path_list(list)),
        (None, Some(file)) => read_path_list_file(file),
        (Some(_), Some(_)) => Err(FitsUtilsError::Config(
            "give either a comma separated list or a list file, not both".to_string(),
        )),
        (None, None) => Err(FitsUtilsError::Config(
            "must provide a comma separated list or a list file".to_string(),
        )),
    }
}
