//! Table definitions for the state store.
//!
//! The base tables exist in every store created by earlier releases.
//! `opened_ports` and `meter_status` arrive with the 1.21 upgrade steps
//! and are created by them when missing.

pub const ENVIRON_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS environ (
        name TEXT PRIMARY KEY,
        uuid TEXT NOT NULL,
        provider_type TEXT NOT NULL
    )
";

pub const CREDENTIALS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS credentials (
        tag TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL
    )
";

pub const MACHINES_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS machines (
        id TEXT PRIMARY KEY,
        nonce TEXT NOT NULL DEFAULT '',
        instance_id TEXT NOT NULL DEFAULT '',
        jobs TEXT NOT NULL DEFAULT '[]' -- JSON array of job names
    )
";

pub const UNITS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS units (
        name TEXT PRIMARY KEY,
        service TEXT NOT NULL,
        machine_id TEXT,
        ports TEXT NOT NULL DEFAULT '[]', -- JSON array of {protocol, number}
        FOREIGN KEY(machine_id) REFERENCES machines(id)
    )
";

pub const OPENED_PORTS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS opened_ports (
        machine_id TEXT NOT NULL,
        network_name TEXT NOT NULL,
        unit_name TEXT NOT NULL,
        protocol TEXT NOT NULL,
        from_port INTEGER NOT NULL,
        to_port INTEGER NOT NULL,
        PRIMARY KEY(machine_id, network_name, protocol, from_port, to_port)
    )
";

pub const METER_STATUS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS meter_status (
        unit_name TEXT PRIMARY KEY,
        code TEXT NOT NULL,
        info TEXT NOT NULL DEFAULT ''
    )
";

/// Tables every pre-1.21 store carries.
pub const BASE_SCHEMAS: &[&str] = &[
    ENVIRON_SCHEMA,
    CREDENTIALS_SCHEMA,
    MACHINES_SCHEMA,
    UNITS_SCHEMA,
];
