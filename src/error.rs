use std::path::PathBuf;

/// Errors raised by the FITS utilities.
#[derive(thiserror::Error, Debug)]
pub enum FitsUtilsError {
    /// A required argument is missing or inconsistent
    #[error("ERROR: {0}")]
    Config(String),

    #[error("Cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },

    #[error("HDU '{hdu}' not found")]
    HduNotFound { hdu: String },

    #[error("Keyword '{key}' not found in HDU '{hdu}'")]
    KeyNotFound { key: String, hdu: String },

    #[error(
        "Problem when writing {}: number of END lines ({ends}) does not match number of HISTORY lines ({histories})",
        .path.display()
    )]
    EndCountMismatch {
        path: PathBuf,
        ends: usize,
        histories: usize,
    },

    #[error(
        "Number of head files made ({made}) does not match required number of head files ({required})"
    )]
    HeadCountMismatch { made: usize, required: usize },

    #[error("No output path available for head segment {segment} (only {available} paths given)")]
    MissingOutputPath { segment: usize, available: usize },

    #[error("Line {line} appears before the first SCAMP HISTORY line")]
    ContentBeforeSentinel { line: usize },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Writing rendered output to its destination failed
    #[error("Cannot write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fits(#[from] fitsio::errors::Error),

    #[error(transparent)]
    Nul(#[from] std::ffi::NulError),
}

impl FitsUtilsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FitsUtilsError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the HDU and keyword lookup failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FitsUtilsError::HduNotFound { .. } | FitsUtilsError::KeyNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FitsUtilsError>;
