#![allow(dead_code)]

use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use upgrade_steps::core::agent::{self, AgentConfig, StateSection};
use upgrade_steps::core::names::MachineTag;
use upgrade_steps::core::state::{self, EnvironConfig};

pub const ENVIRONMENT: &str = "prod";
pub const PASSWORD: &str = "sekrit";

/// A data dir holding machine 0's agent configuration and a fresh store.
pub struct Fixture {
    pub dir: TempDir,
    pub data_dir: PathBuf,
    pub state_path: PathBuf,
}

pub fn fixture(provider: &str) -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    let data_dir = dir.path().join("data");
    let state_path = dir.path().join("state.db");

    state::initialize(
        &state_path,
        &EnvironConfig {
            name: ENVIRONMENT.to_string(),
            uuid: "deadbeef-0bad-400d-8000-4b1d0d06f00d".to_string(),
            provider_type: provider.to_string(),
        },
        &[("machine-0", PASSWORD)],
    )
    .expect("initialize state");

    write_agent_config(
        &data_dir,
        Some(StateSection {
            path: state_path.clone(),
            password: Some(PASSWORD.to_string()),
        }),
    );

    Fixture {
        dir,
        data_dir,
        state_path,
    }
}

pub fn write_agent_config(data_dir: &Path, state: Option<StateSection>) -> PathBuf {
    let tag = MachineTag::new("0").expect("machine tag");
    let config = AgentConfig::new(&tag, ENVIRONMENT, state);
    agent::write_config(data_dir, &tag, &config).expect("write agent config")
}

pub fn conn(path: &Path) -> Connection {
    Connection::open(path).expect("open state")
}

pub fn add_machine(path: &Path, id: &str, nonce: &str, instance_id: &str, jobs: &[&str]) {
    let jobs = serde_json::to_string(jobs).expect("jobs json");
    conn(path)
        .execute(
            "INSERT INTO machines (id, nonce, instance_id, jobs) VALUES (?1, ?2, ?3, ?4)",
            params![id, nonce, instance_id, jobs],
        )
        .expect("insert machine");
}

pub fn add_unit(path: &Path, name: &str, machine_id: Option<&str>, ports: &[(&str, i64)]) {
    let ports: Vec<serde_json::Value> = ports
        .iter()
        .map(|(protocol, number)| serde_json::json!({"protocol": protocol, "number": number}))
        .collect();
    let service = name.split('/').next().unwrap_or(name);
    conn(path)
        .execute(
            "INSERT INTO units (name, service, machine_id, ports) VALUES (?1, ?2, ?3, ?4)",
            params![name, service, machine_id, serde_json::to_string(&ports).unwrap()],
        )
        .expect("insert unit");
}

pub fn machine_jobs(path: &Path, id: &str) -> Vec<String> {
    let jobs: String = conn(path)
        .query_row("SELECT jobs FROM machines WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .expect("machine jobs");
    serde_json::from_str(&jobs).expect("jobs json")
}

pub fn unit_ports(path: &Path, name: &str) -> String {
    conn(path)
        .query_row("SELECT ports FROM units WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .expect("unit ports")
}

/// `(machine, network, unit, protocol, from, to)` rows, ordered.
pub fn opened_ports(path: &Path) -> Vec<(String, String, String, String, i64, i64)> {
    let conn = conn(path);
    let mut stmt = conn
        .prepare(
            "SELECT machine_id, network_name, unit_name, protocol, from_port, to_port
             FROM opened_ports ORDER BY machine_id, unit_name, from_port",
        )
        .expect("prepare opened ports");
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })
        .expect("query opened ports")
        .collect::<Result<Vec<_>, _>>()
        .expect("opened ports rows");
    rows
}

pub fn meter_status(path: &Path) -> Vec<(String, String)> {
    let conn = conn(path);
    let mut stmt = conn
        .prepare("SELECT unit_name, code FROM meter_status ORDER BY unit_name")
        .expect("prepare meter status");
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query meter status")
        .collect::<Result<Vec<_>, _>>()
        .expect("meter status rows");
    rows
}

pub fn table_exists(path: &Path, table: &str) -> bool {
    let count: i64 = conn(path)
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .expect("sqlite_master");
    count > 0
}

/// SQLite removes the WAL file once the last connection to the store closes.
pub fn wal_released(path: &Path) -> bool {
    let mut wal = path.as_os_str().to_owned();
    wal.push("-wal");
    !Path::new(&wal).exists()
}
