//! The 1.21 upgrade steps.
//!
//! Each step is idempotent and runs in its own transaction. Steps are
//! applied in order and the first failure stops the run; steps already
//! applied stay applied, so re-running the whole tool is the recovery.

pub mod meter_status;
pub mod networking;
pub mod opened_ports;

use crate::core::error::UpgradeError;
use crate::core::output::Context;
use crate::core::state::State;
use tracing::info;

/// Upgrade step definition
pub struct UpgradeStep {
    /// Short identifier used in errors and logs
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Step function
    pub apply: fn(&State) -> Result<(), UpgradeError>,
}

/// All steps in the order they must run
pub fn all_steps() -> Vec<UpgradeStep> {
    vec![
        UpgradeStep {
            name: "migrate-opened-ports",
            description: "migrate individual unit ports to opened ports",
            apply: opened_ports::migrate_unit_ports_to_opened_ports,
        },
        UpgradeStep {
            name: "create-meter-status",
            description: "create entries in meter status for existing units",
            apply: meter_status::create_unit_meter_status,
        },
        UpgradeStep {
            name: "migrate-networking-jobs",
            description: "migrate machine jobs into ones with JobManageNetworking based on rules",
            apply: networking::migrate_job_manage_networking,
        },
    ]
}

/// Applies `steps` in order, announcing each one on the context before it runs.
pub fn apply_steps(
    st: &State,
    steps: &[UpgradeStep],
    ctx: &mut Context<'_>,
) -> Result<usize, UpgradeError> {
    for (i, step) in steps.iter().enumerate() {
        ctx.infof(format_args!("\nStep {}: {}", i + 1, step.description));
        info!(step = step.name, "applying upgrade step");
        (step.apply)(st).map_err(|e| UpgradeError::MigrationStepError {
            step: step.name,
            source: Box::new(e),
        })?;
    }

    info!(steps = steps.len(), "upgrade steps applied");
    Ok(steps.len())
}
