//! The controller's state store.
//!
//! A [`State`] owns the single connection used for a run. It is released
//! exactly once: either by [`State::close`] or, on every other exit path,
//! when the handle is dropped.

use crate::core::agent::StateInfo;
use crate::core::db::{self, DialOpts};
use crate::core::error::UpgradeError;
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Provider types a store may be configured with.
pub const KNOWN_PROVIDERS: &[&str] = &[
    "local",
    "manual",
    "maas",
    "ec2",
    "openstack",
    "azure",
    "joyent",
    "gce",
    "dummy",
];

/// The environment a store belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironConfig {
    pub name: String,
    pub uuid: String,
    pub provider_type: String,
}

/// Checks applied to a store's environment before it is handed out.
pub trait Policy {
    fn validate_environ(&self, environ: &EnvironConfig) -> Result<(), UpgradeError>;
}

/// Accepts environments whose provider is one of [`KNOWN_PROVIDERS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironPolicy;

impl Policy for EnvironPolicy {
    fn validate_environ(&self, environ: &EnvironConfig) -> Result<(), UpgradeError> {
        if KNOWN_PROVIDERS.contains(&environ.provider_type.as_str()) {
            Ok(())
        } else {
            Err(UpgradeError::ConnectionError(format!(
                "no registered provider for {:?}",
                environ.provider_type
            )))
        }
    }
}

pub struct State {
    conn: Option<Connection>,
    environ: EnvironConfig,
    path: PathBuf,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("path", &self.path)
            .field("environ", &self.environ)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Connects to the store described by `info` on behalf of `environment`.
pub fn open(
    environment: &str,
    info: &StateInfo,
    opts: DialOpts,
    policy: &dyn Policy,
) -> Result<State, UpgradeError> {
    debug!(path = %info.path.display(), tag = %info.tag, "connecting to state");
    if !info.path.exists() {
        return Err(UpgradeError::ConnectionError(format!(
            "no state store at {}",
            info.path.display()
        )));
    }
    let conn = db::db_connect(&info.path, &opts)?;

    let environ = read_environ(&conn)?;
    if environ.name != environment {
        return Err(UpgradeError::ConnectionError(format!(
            "state belongs to environment {:?}, not {:?}",
            environ.name, environment
        )));
    }
    if let Some(password) = &info.password {
        authenticate(&conn, &info.tag, password)?;
    }
    policy.validate_environ(&environ)?;
    db::enable_wal(&conn).map_err(|e| {
        UpgradeError::ConnectionError(format!("{}: {}", info.path.display(), e))
    })?;

    debug!(environ = %environ.name, provider = %environ.provider_type, "connected to state");
    Ok(State {
        conn: Some(conn),
        environ,
        path: info.path.clone(),
    })
}

fn read_environ(conn: &Connection) -> Result<EnvironConfig, UpgradeError> {
    conn.query_row(
        "SELECT name, uuid, provider_type FROM environ LIMIT 1",
        [],
        |row| {
            Ok(EnvironConfig {
                name: row.get(0)?,
                uuid: row.get(1)?,
                provider_type: row.get(2)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            UpgradeError::ConnectionError("state has no environment configured".to_string())
        }
        other => UpgradeError::ConnectionError(format!("cannot read environment: {}", other)),
    })
}

fn authenticate(conn: &Connection, tag: &str, password: &str) -> Result<(), UpgradeError> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT password_hash FROM credentials WHERE tag = ?1",
            params![tag],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| UpgradeError::ConnectionError(format!("cannot read credentials: {}", e)))?;
    match stored {
        Some(hash) if hash == password_hash(password) => Ok(()),
        _ => Err(UpgradeError::ConnectionError(format!(
            "unauthorized access for {}",
            tag
        ))),
    }
}

/// Hex-encoded SHA-256 of `password`, as stored in `credentials`.
pub fn password_hash(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Creates a new store at `path` for `environ`, with login `credentials` as `(tag, password)`.
pub fn initialize(
    path: &Path,
    environ: &EnvironConfig,
    credentials: &[(&str, &str)],
) -> Result<(), UpgradeError> {
    let conn = db::db_create(path)?;
    for schema in schemas::BASE_SCHEMAS {
        conn.execute(schema, [])?;
    }
    conn.execute(
        "INSERT INTO environ (name, uuid, provider_type) VALUES (?1, ?2, ?3)",
        params![environ.name, environ.uuid, environ.provider_type],
    )?;
    for (tag, password) in credentials {
        conn.execute(
            "INSERT OR REPLACE INTO credentials (tag, password_hash) VALUES (?1, ?2)",
            params![tag, password_hash(password)],
        )?;
    }
    conn.close().map_err(|(_, e)| UpgradeError::RusqliteError(e))?;
    Ok(())
}

impl State {
    pub fn environ(&self) -> &EnvironConfig {
        &self.environ
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    fn conn(&self) -> Result<&Connection, UpgradeError> {
        self.conn
            .as_ref()
            .ok_or_else(|| UpgradeError::ConnectionError("state already closed".to_string()))
    }

    /// Runs `f` inside a transaction, committing only when it succeeds.
    pub fn run_transaction<F, R>(&self, f: F) -> Result<R, UpgradeError>
    where
        F: FnOnce(&Connection) -> Result<R, UpgradeError>,
    {
        let tx = self.conn()?.unchecked_transaction()?;
        let result = f(&*tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Releases the connection. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), UpgradeError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| {
                UpgradeError::ConnectionError(format!("cannot close state: {}", e))
            })?;
            debug!(path = %self.path.display(), "state closed");
        }
        Ok(())
    }
}

impl Drop for State {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => debug!(path = %self.path.display(), "state closed"),
                Err((_, e)) => warn!(path = %self.path.display(), "cannot close state: {}", e),
            }
        }
    }
}
