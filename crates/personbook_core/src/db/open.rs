//! Connection bootstrap for the encrypted store.
//!
//! # Responsibility
//! - Open file or in-memory SQLCipher connections and apply the key.
//! - Probe the key before any migration touches the file.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections are keyed and have migrations fully applied.
//! - The passphrase never appears in log lines.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens, keys and migrates a store connection.
///
/// # Side effects
/// - Creates the parent directory of a file-backed store when missing.
/// - Emits `db_open` logging events with duration and status.
///
/// # Errors
/// - `AccessDenied` when the passphrase does not decrypt the file.
/// - `UnsupportedSchemaVersion` when the file is newer than this binary and
///   the policy is `FailClosed`.
pub fn open_db(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = mode_label(&config.location);
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match connect(&config.location) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
    };

    match bootstrap_connection(&mut conn, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            let error_code = match err {
                DbError::AccessDenied => "db_access_denied",
                DbError::UnsupportedSchemaVersion { .. } => "db_schema_unsupported",
                _ => "db_bootstrap_failed",
            };
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
                mode,
                started_at.elapsed().as_millis(),
                error_code,
                err
            );
            Err(err)
        }
    }
}

fn connect(location: &StoreLocation) -> DbResult<Connection> {
    match location {
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| {
                    DbError::InvalidConfig(format!(
                        "failed to create store directory `{}`: {err}",
                        parent.display()
                    ))
                })?;
            }
            Ok(Connection::open(path)?)
        }
        StoreLocation::Memory => Ok(Connection::open_in_memory()?),
    }
}

fn bootstrap_connection(conn: &mut Connection, config: &StoreConfig) -> DbResult<()> {
    conn.pragma_update(None, "key", config.passphrase.expose())?;
    probe_key(conn)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn, config.migration_policy)?;
    Ok(())
}

// SQLCipher only validates the key on the first page read.
fn probe_key(conn: &Connection) -> DbResult<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master;", [], |row| {
        row.get::<_, i64>(0)
    })?;
    Ok(())
}

fn mode_label(location: &StoreLocation) -> &'static str {
    match location {
        StoreLocation::File(_) => "file",
        StoreLocation::Memory => "memory",
    }
}
