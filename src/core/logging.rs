//! Diagnostic logging setup.
//!
//! The level is chosen on the command line and handed in here once at
//! startup; `RUST_LOG` takes precedence when set.

use crate::core::error::UpgradeError;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// Parses a level name such as `info` or `debug`.
pub fn parse_level(level: &str) -> Result<LevelFilter, UpgradeError> {
    LevelFilter::from_str(level)
        .map_err(|_| UpgradeError::InvalidArgument(format!("invalid log level {:?}", level)))
}

/// Installs the stderr subscriber. A subscriber already installed is kept.
pub fn init(level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), LevelFilter::WARN);
        assert_eq!(parse_level("off").unwrap(), LevelFilter::OFF);
        assert!(matches!(
            parse_level("chatty"),
            Err(UpgradeError::InvalidArgument(_))
        ));
    }
}
