//! Create-once store registry.
//!
//! # Responsibility
//! - Give every caller the same live `PersonStore` for one configuration.
//! - Make concurrent first-time opens race-free.
//!
//! # Invariants
//! - At most one physical open per registry while a handle is live.
//! - `open` after `close` performs a fresh physical open.

use super::{DbError, DbResult, PersonStore};
use crate::config::StoreConfig;
use log::debug;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Caller-owned registry replacing a process-wide database singleton.
pub struct StoreRegistry {
    config: StoreConfig,
    slot: RwLock<Option<PersonStore>>,
    physical_opens: AtomicU64,
}

impl StoreRegistry {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            slot: RwLock::new(None),
            physical_opens: AtomicU64::new(0),
        }
    }

    /// Returns the live store, opening it on first use.
    ///
    /// Double-checked: a shared read lock serves the common case, the write
    /// lock re-checks before opening.
    pub fn open(&self) -> DbResult<PersonStore> {
        if let Some(store) = self.slot.read().as_ref().filter(|store| store.is_open()) {
            return Ok(store.clone());
        }

        let mut slot = self.slot.write();
        if let Some(store) = slot.as_ref().filter(|store| store.is_open()) {
            return Ok(store.clone());
        }

        let store = PersonStore::open(&self.config)?;
        let opens = self.physical_opens.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("event=store_registry_open module=db status=ok physical_opens={opens}");
        *slot = Some(store.clone());
        Ok(store)
    }

    /// Returns the live store without opening it.
    ///
    /// # Errors
    /// - `NotInitialized` before `open` or after `close`.
    pub fn get(&self) -> DbResult<PersonStore> {
        self.slot
            .read()
            .as_ref()
            .filter(|store| store.is_open())
            .cloned()
            .ok_or(DbError::NotInitialized)
    }

    /// Closes the live store, invalidating every handle given out.
    pub fn close(&self) -> DbResult<()> {
        match self.slot.write().take() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    /// Number of physical opens performed so far.
    pub fn physical_opens(&self) -> u64 {
        self.physical_opens.load(Ordering::SeqCst)
    }
}
