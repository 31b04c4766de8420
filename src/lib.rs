//! upgrade-steps: runs the missing 1.21 upgrade steps against a controller's
//! state store.
//!
//! The tool reads the machine agent's configuration to find the store,
//! connects, and applies three idempotent steps in order:
//!
//! 1. move per-unit port lists into `opened_ports`,
//! 2. create a meter status record for units lacking one,
//! 3. add `JobManageNetworking` to machines whose networking the agent manages.
//!
//! The first failure stops the run. Steps already applied stay applied;
//! re-running the tool is the recovery path.
//!
//! ```bash
//! upgrade-steps 0
//! upgrade-steps 1/lxc/0 --data-dir /srv/juju --log-level info
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: errors, machine names, agent configuration, the state store
//! - [`steps`]: the ordered upgrade steps

pub mod cli;
pub mod core;
pub mod steps;

use crate::cli::Cli;
use crate::core::{
    agent,
    db::DialOpts,
    error::UpgradeError,
    logging,
    names::MachineTag,
    output::Context,
    state::{self, EnvironPolicy},
};
use clap::Parser;
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;

/// Exit code for a failed command.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when no execution context could be set up.
pub const EXIT_CONTEXT_FAILURE: i32 = 2;

/// A validated invocation.
#[derive(Debug, Clone)]
pub struct UpgradeCommand {
    pub machine_tag: MachineTag,
    pub data_dir: PathBuf,
    pub log_level: LevelFilter,
}

impl UpgradeCommand {
    /// Validates parsed arguments. Nothing is read from disk here.
    pub fn init(cli: Cli) -> Result<Self, UpgradeError> {
        let mut args = cli.args.into_iter();
        let machine_id = args
            .next()
            .ok_or_else(|| UpgradeError::InvalidArgument("missing machine-id".to_string()))?;
        let machine_tag = MachineTag::new(&machine_id)?;
        let extra: Vec<String> = args.collect();
        if !extra.is_empty() {
            return Err(UpgradeError::InvalidArgument(format!(
                "unrecognized args: {:?}",
                extra
            )));
        }
        let log_level = logging::parse_level(&cli.log_level)?;
        Ok(Self {
            machine_tag,
            data_dir: cli.data_dir,
            log_level,
        })
    }

    /// Parses and validates a full argument list, program name first.
    pub fn from_args<I, T>(args: I) -> Result<Self, UpgradeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| UpgradeError::InvalidArgument(e.to_string()))?;
        Self::init(cli)
    }

    pub fn run(&self, ctx: &mut Context<'_>) -> Result<(), UpgradeError> {
        let data_dir = ctx.abs_path(&self.data_dir);
        let conf = agent::read_agent_config(&data_dir, &self.machine_tag)?;
        debug!(tag = %self.machine_tag, environment = conf.environment(), "agent configuration loaded");

        let mut info = conf
            .state_info()
            .ok_or_else(|| UpgradeError::ConfigError("no state info available".to_string()))?;
        if info.path.as_os_str().is_empty() {
            return Err(UpgradeError::ConfigError("state path is empty".to_string()));
        }
        info.path = ctx.abs_path(&info.path);
        let mut st = state::open(conf.environment(), &info, DialOpts::default(), &EnvironPolicy)?;

        steps::apply_steps(&st, &steps::all_steps(), ctx)?;

        st.close()
    }
}

/// Runs the command for `args` and returns the process exit code.
pub fn main_with_args<I, T>(args: I, ctx: &mut Context<'_>) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = write!(ctx.stdout, "{}", e);
            return 0;
        }
        Err(e) => {
            let _ = write!(ctx.stderr, "{}", e);
            return EXIT_FAILURE;
        }
    };

    let result = UpgradeCommand::init(cli).and_then(|cmd| {
        logging::init(cmd.log_level);
        cmd.run(ctx)
    });
    match result {
        Ok(()) => 0,
        Err(err) => {
            ctx.write_error(&err);
            EXIT_FAILURE
        }
    }
}
