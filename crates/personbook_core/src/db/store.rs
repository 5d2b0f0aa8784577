//! Shared handle over one open store connection.
//!
//! # Responsibility
//! - Serialize every read and write on the single connection.
//! - Publish a change generation after each write that touched rows.
//! - Invalidate all clones of the handle on `close`.
//!
//! # Invariants
//! - After `close`, every operation fails with `NotInitialized`.
//! - The change generation only grows while the store is open.

use super::migrations::current_user_version;
use super::{open_db, DbError, DbResult};
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle to an open person store.
///
/// Clones share one connection; closing through any clone closes all.
#[derive(Clone)]
pub struct PersonStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    location: StoreLocation,
    state: Mutex<Option<OpenState>>,
}

struct OpenState {
    conn: Connection,
    changes: watch::Sender<u64>,
}

impl PersonStore {
    /// Opens, keys and migrates a store described by `config`.
    ///
    /// Prefer [`super::StoreRegistry::open`] when several callers share one
    /// store; this function always performs a physical open.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let conn = open_db(config)?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            inner: Arc::new(StoreInner {
                location: config.location.clone(),
                state: Mutex::new(Some(OpenState { conn, changes })),
            }),
        })
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().is_some()
    }

    /// Returns whether both handles refer to the same physical open.
    pub fn same_handle(&self, other: &PersonStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Closes the connection and invalidates every clone of this handle.
    ///
    /// Closing an already closed store is a no-op. Live queries observe the
    /// close as end-of-stream.
    pub fn close(&self) -> DbResult<()> {
        let Some(state) = self.inner.state.lock().take() else {
            return Ok(());
        };
        drop(state.changes);
        match state.conn.close() {
            Ok(()) => {
                info!("event=db_close module=db status=ok");
                Ok(())
            }
            Err((_, err)) => {
                error!("event=db_close module=db status=error error={err}");
                Err(err.into())
            }
        }
    }

    /// Runs a read-only closure against the connection.
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let guard = self.inner.state.lock();
        let state = guard.as_ref().ok_or(DbError::NotInitialized)?;
        f(&state.conn)
    }

    /// Runs a mutating closure and bumps the change generation when the last
    /// statement touched at least one row.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let guard = self.inner.state.lock();
        let state = guard.as_ref().ok_or(DbError::NotInitialized)?;
        let value = f(&state.conn)?;
        if state.conn.changes() > 0 {
            state.changes.send_modify(|generation| *generation += 1);
        }
        Ok(value)
    }

    /// Subscribes to change generations.
    ///
    /// The receiver reports an error from `changed()` once the store closes.
    pub fn subscribe_changes(&self) -> DbResult<watch::Receiver<u64>> {
        let guard = self.inner.state.lock();
        let state = guard.as_ref().ok_or(DbError::NotInitialized)?;
        Ok(state.changes.subscribe())
    }

    /// Current change generation; `0` right after open.
    pub fn change_generation(&self) -> DbResult<u64> {
        let guard = self.inner.state.lock();
        let state = guard.as_ref().ok_or(DbError::NotInitialized)?;
        let generation = *state.changes.borrow();
        Ok(generation)
    }

    pub fn schema_version(&self) -> DbResult<u32> {
        self.read(|conn| current_user_version(conn))
    }
}

impl std::fmt::Debug for PersonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonStore")
            .field("location", &self.inner.location)
            .field("open", &self.is_open())
            .finish()
    }
}
