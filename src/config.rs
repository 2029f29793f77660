//! Runtime settings shared by every FITS utility operation.
//!
//! The debug level is read once at startup (from `FITSUTILS_DEBUG` and the
//! CLI) and passed to each operation.

/// Integer verbosity for the HDU and close traces
pub const DEBUG_ENV_VAR: &str = "FITSUTILS_DEBUG";

/// Level at which HDU operations are traced
pub const TRACE_HDU_LEVEL: u32 = 3;

/// Level at which file closes are traced
pub const TRACE_CLOSE_LEVEL: u32 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub debug_level: u32,
}

impl Config {
    pub fn new(debug_level: u32) -> Self {
        Self { debug_level }
    }

    /// Build from `FITSUTILS_DEBUG`; unset or non-numeric means level 0.
    pub fn from_env() -> Self {
        Self::new(parse_debug_level(std::env::var(DEBUG_ENV_VAR).ok().as_deref()))
    }

    /// Raise the debug level to at least `level`.
    pub fn with_min_debug_level(self, level: u32) -> Self {
        Self {
            debug_level: self.debug_level.max(level),
        }
    }

    /// Check if messages at `level` should be emitted
    pub fn debug_check(&self, level: u32) -> bool {
        self.debug_level >= level
    }
}

fn parse_debug_level(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).unwrap_or(0)
}

/// Emit a debug event only when the config's level reaches `$level`.
#[macro_export]
macro_rules! debug_print {
    ($config:expr, $level:expr, $($arg:tt)*) => {
        if $config.debug_check($level) {
            ::tracing::debug!($($arg)*);
        }
    };
}
