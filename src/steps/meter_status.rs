//! Gives every unit a meter status record.

use crate::core::error::UpgradeError;
use crate::core::schemas;
use crate::core::state::State;
use rusqlite::params;
use tracing::debug;

/// Meter status code for units that have never reported one.
pub const METER_NOT_SET: &str = "NOT SET";

pub fn create_unit_meter_status(st: &State) -> Result<(), UpgradeError> {
    st.run_transaction(|conn| {
        conn.execute(schemas::METER_STATUS_SCHEMA, [])?;
        let created = conn.execute(
            "INSERT INTO meter_status (unit_name, code, info)
             SELECT u.name, ?1, '' FROM units u
             WHERE NOT EXISTS (SELECT 1 FROM meter_status m WHERE m.unit_name = u.name)",
            params![METER_NOT_SET],
        )?;
        debug!(created, "meter status entries created");
        Ok(())
    })
}
