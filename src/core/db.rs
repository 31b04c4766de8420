use crate::core::error;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

/// Default time to wait for a busy store before giving up.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Options applied when dialing the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialOpts {
    pub timeout: Duration,
}

impl Default for DialOpts {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }
}

/// Opens an existing store read-write. A missing file is an error, not a new store.
///
/// The store's journal mode is left alone; see [`enable_wal`].
pub fn db_connect(db_path: &Path, opts: &DialOpts) -> Result<Connection, error::UpgradeError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(db_path, flags).map_err(|e| {
        error::UpgradeError::ConnectionError(format!("{}: {}", db_path.display(), e))
    })?;
    configure(&conn, opts)
        .map_err(|e| error::UpgradeError::ConnectionError(format!("{}: {}", db_path.display(), e)))?;
    Ok(conn)
}

/// Opens the store at `db_path`, creating the file when it does not exist.
pub fn db_create(db_path: &Path) -> Result<Connection, error::UpgradeError> {
    let conn = Connection::open(db_path)?;
    configure(&conn, &DialOpts::default())?;
    enable_wal(&conn)?;
    Ok(conn)
}

/// Switches the store to WAL. The mode is persisted in the database file.
pub fn enable_wal(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
}

/// Current journal mode of the store, lowercased as SQLite reports it.
pub fn journal_mode(conn: &Connection) -> Result<String, rusqlite::Error> {
    conn.query_row("PRAGMA journal_mode;", [], |row| row.get(0))
}

fn configure(conn: &Connection, opts: &DialOpts) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(opts.timeout)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(())
}
