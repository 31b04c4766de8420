use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("cannot read agent configuration: {0}")]
    ConfigError(String),
    #[error("cannot connect to state: {0}")]
    ConnectionError(String),
    #[error("{step}: {source}")]
    MigrationStepError {
        step: &'static str,
        #[source]
        source: Box<UpgradeError>,
    },
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid port range: {0}")]
    InvalidPortRange(String),
}

