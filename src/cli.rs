//! CLI struct definitions for the upgrade-steps command line.

use crate::core::agent::DEFAULT_DATA_DIR;
use crate::core::logging::DEFAULT_LOG_LEVEL;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "upgrade-steps",
    version = env!("CARGO_PKG_VERSION"),
    about = "Run the missing 1.21 upgrade steps against the state store"
)]
pub struct Cli {
    /// Machine id of the agent whose configuration locates the state store.
    #[clap(value_name = "MACHINE_ID")]
    pub args: Vec<String>,
    /// Directory for agent data.
    #[clap(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
    /// Diagnostic log level: off, error, warn, info, debug or trace.
    #[clap(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}
