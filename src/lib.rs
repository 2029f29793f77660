pub mod cli;
pub mod combine;
pub mod commands;
pub mod config;
pub mod error;
pub mod fits;
pub mod header;
pub mod mef;
pub mod metadata;
pub mod printer;
pub mod scamp;
pub mod utils;
pub mod writer;

#[cfg(test)]
mod test_support;

// Re-export commonly used items
pub use config::Config;
pub use error::{FitsUtilsError, Result};
pub use fits::{get_hdr_extra, get_hdr_value, get_header, HduSelector};
pub use header::{Card, Header, HeaderValue};
pub use metadata::{DerivedField, DerivedValue};
