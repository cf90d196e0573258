//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_IMMO_PIPELINE` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no logging will be initialized.
//! - **Enabled**: `"trace"`, `"debug"`, `"info"`, `"warn"` or `"error"` select that maximum level;
//!   any other value enables logging with a maximum level of `DEBUG`.
//!
//! The pipeline reports stage progress and diagnostics through `tracing` events, so enabling the
//! variable is how a user sees them.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_IMMO_PIPELINE=info
//! ```

use ctor::ctor;
use tracing::Level;

const LOG_ENV_VAR: &str = "DEBUG_IMMO_PIPELINE";

fn level_from(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" => None,
        "trace" => Some(Level::TRACE),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => Some(Level::DEBUG),
    }
}

#[ctor]
fn set_debug_level() {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|v| level_from(&v));

    if let Some(level) = level {
        // try_init: a host binary may already have installed a subscriber.
        let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_disabled_values() {
        assert_eq!(level_from(""), None);
        assert_eq!(level_from("0"), None);
        assert_eq!(level_from("FALSE"), None);
    }

    #[test]
    fn test_level_from_named_levels() {
        assert_eq!(level_from("info"), Some(Level::INFO));
        assert_eq!(level_from("warn"), Some(Level::WARN));
        assert_eq!(level_from("error"), Some(Level::ERROR));
        assert_eq!(level_from("true"), Some(Level::DEBUG));
    }
}
