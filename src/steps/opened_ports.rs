//! Moves per-unit port lists into `opened_ports`.
//!
//! Before 1.21 each unit carried its own `ports` list. From 1.21 on, open
//! ports are recorded per machine and network as port ranges owned by a
//! unit. A unit's ports are cleared once its ranges are recorded.

use crate::core::error::UpgradeError;
use crate::core::schemas;
use crate::core::state::State;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;
use tracing::{debug, warn};

/// Network every pre-1.21 port was opened on.
pub const DEFAULT_NETWORK: &str = "juju-public";

const PROTOCOLS: &[&str] = &["tcp", "udp"];
const MIN_PORT: i64 = 1;
const MAX_PORT: i64 = 65535;

#[derive(Debug, Clone, Deserialize)]
struct UnitPort {
    protocol: String,
    number: i64,
}

struct UnitPorts {
    unit: String,
    machine_id: Option<String>,
    ports: String,
}

pub fn migrate_unit_ports_to_opened_ports(st: &State) -> Result<(), UpgradeError> {
    st.run_transaction(|conn| {
        conn.execute(schemas::OPENED_PORTS_SCHEMA, [])?;

        let units = {
            let mut stmt = conn.prepare(
                "SELECT name, machine_id, ports FROM units WHERE ports != '[]' ORDER BY name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(UnitPorts {
                    unit: row.get(0)?,
                    machine_id: row.get(1)?,
                    ports: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut migrated = 0;
        for entry in units {
            let ports: Vec<UnitPort> = serde_json::from_str(&entry.ports)?;
            if ports.is_empty() {
                continue;
            }
            let Some(machine_id) = entry.machine_id else {
                warn!(unit = %entry.unit, "unit has ports but no machine; leaving them in place");
                continue;
            };
            for port in &ports {
                open_port(conn, &machine_id, &entry.unit, port)?;
            }
            conn.execute(
                "UPDATE units SET ports = '[]' WHERE name = ?1",
                params![entry.unit],
            )?;
            debug!(unit = %entry.unit, machine = %machine_id, ports = ports.len(), "ports migrated");
            migrated += 1;
        }
        debug!(units = migrated, "unit ports migrated to opened ports");
        Ok(())
    })
}

fn open_port(
    conn: &Connection,
    machine_id: &str,
    unit: &str,
    port: &UnitPort,
) -> Result<(), UpgradeError> {
    let protocol = port.protocol.to_lowercase();
    if !PROTOCOLS.contains(&protocol.as_str()) {
        return Err(UpgradeError::InvalidPortRange(format!(
            "unit {:?}: invalid protocol {:?}, expected \"tcp\" or \"udp\"",
            unit, port.protocol
        )));
    }
    if !(MIN_PORT..=MAX_PORT).contains(&port.number) {
        return Err(UpgradeError::InvalidPortRange(format!(
            "unit {:?}: port {} outside the valid range {}-{}",
            unit, port.number, MIN_PORT, MAX_PORT
        )));
    }
    let owner: Option<String> = conn
        .query_row(
            "SELECT unit_name FROM opened_ports
             WHERE machine_id = ?1 AND network_name = ?2 AND protocol = ?3
               AND from_port <= ?4 AND to_port >= ?4",
            params![machine_id, DEFAULT_NETWORK, protocol, port.number],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        Some(owner) if owner == unit => Ok(()),
        Some(owner) => Err(UpgradeError::Conflict(format!(
            "cannot open port {}/{} for unit {:?} on machine {}: already opened by unit {:?}",
            port.number, protocol, unit, machine_id, owner
        ))),
        None => {
            conn.execute(
                "INSERT INTO opened_ports
                 (machine_id, network_name, unit_name, protocol, from_port, to_port)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![machine_id, DEFAULT_NETWORK, unit, protocol, port.number],
            )?;
            Ok(())
        }
    }
}
