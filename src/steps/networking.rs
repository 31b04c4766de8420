//! Adds `JobManageNetworking` to machines whose networking the agent should manage.
//!
//! Skipped entirely on MAAS, Joyent and manual environments. Otherwise
//! every machine gets the job except manually provisioned ones and, in a
//! local environment, the host machine.

use crate::core::error::UpgradeError;
use crate::core::state::State;
use rusqlite::params;
use tracing::debug;

pub const JOB_MANAGE_NETWORKING: &str = "JobManageNetworking";

const MANUAL_MACHINE_PREFIX: &str = "manual:";
const BOOTSTRAP_MACHINE_ID: &str = "0";
const UNMANAGED_PROVIDERS: &[&str] = &["maas", "joyent", "manual"];

struct MachineJobs {
    id: String,
    nonce: String,
    instance_id: String,
    jobs: String,
}

impl MachineJobs {
    fn is_manual(&self) -> bool {
        self.nonce.starts_with(MANUAL_MACHINE_PREFIX)
            || self.instance_id.starts_with(MANUAL_MACHINE_PREFIX)
    }
}

pub fn migrate_job_manage_networking(st: &State) -> Result<(), UpgradeError> {
    let provider = st.environ().provider_type.as_str();
    if UNMANAGED_PROVIDERS.contains(&provider) {
        debug!(provider, "provider manages networking itself; no jobs added");
        return Ok(());
    }
    let is_local = provider == "local";

    st.run_transaction(|conn| {
        let machines = {
            let mut stmt =
                conn.prepare("SELECT id, nonce, instance_id, jobs FROM machines ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(MachineJobs {
                    id: row.get(0)?,
                    nonce: row.get(1)?,
                    instance_id: row.get(2)?,
                    jobs: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for machine in machines {
            if is_local && machine.id == BOOTSTRAP_MACHINE_ID {
                continue;
            }
            if machine.is_manual() {
                debug!(machine = %machine.id, "manually provisioned; skipped");
                continue;
            }
            let mut jobs: Vec<String> = serde_json::from_str(&machine.jobs)?;
            if jobs.iter().any(|job| job == JOB_MANAGE_NETWORKING) {
                continue;
            }
            jobs.push(JOB_MANAGE_NETWORKING.to_string());
            conn.execute(
                "UPDATE machines SET jobs = ?1 WHERE id = ?2",
                params![serde_json::to_string(&jobs)?, machine.id],
            )?;
            debug!(machine = %machine.id, "added {}", JOB_MANAGE_NETWORKING);
        }
        Ok(())
    })
}
