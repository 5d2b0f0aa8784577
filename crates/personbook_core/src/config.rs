//! Store configuration.
//!
//! # Responsibility
//! - Describe where the store lives, how it is keyed and how version gaps
//!   are handled.
//! - Load that description from the process environment.
//!
//! # Invariants
//! - The passphrase is never printed by `Debug`.
//! - There is no built-in default passphrase; callers must inject one.

use crate::db::{DbError, DbResult};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "PERSONBOOK_DB_PATH";
pub const ENV_DB_PASSPHRASE: &str = "PERSONBOOK_DB_PASSPHRASE";
pub const ENV_MIGRATION_POLICY: &str = "PERSONBOOK_MIGRATION_POLICY";

/// Secret used to key the encrypted store file.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wraps a non-empty secret.
    ///
    /// # Errors
    /// - Returns `InvalidConfig` when the secret is empty.
    pub fn new(secret: impl Into<String>) -> DbResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(DbError::InvalidConfig(
                "passphrase cannot be empty".to_string(),
            ));
        }
        Ok(Self(secret))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Passphrase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// What to do when the file carries a schema version this binary cannot
/// migrate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationPolicy {
    /// Refuse to open and leave the file untouched.
    #[default]
    FailClosed,
    /// Drop `persons` and recreate it at the latest version. Loses all rows.
    DestructiveRecreate,
}

impl MigrationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailClosed => "fail_closed",
            Self::DestructiveRecreate => "destructive_recreate",
        }
    }
}

/// Where the store is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Complete store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub passphrase: Passphrase,
    pub migration_policy: MigrationPolicy,
}

impl StoreConfig {
    /// File-backed store with the default `FailClosed` policy.
    pub fn file(path: impl AsRef<Path>, passphrase: Passphrase) -> Self {
        Self {
            location: StoreLocation::File(path.as_ref().to_path_buf()),
            passphrase,
            migration_policy: MigrationPolicy::default(),
        }
    }

    /// In-memory store, used by tests and smoke runs.
    pub fn in_memory(passphrase: Passphrase) -> Self {
        Self {
            location: StoreLocation::Memory,
            passphrase,
            migration_policy: MigrationPolicy::default(),
        }
    }

    pub fn with_migration_policy(mut self, policy: MigrationPolicy) -> Self {
        self.migration_policy = policy;
        self
    }

    /// Loads configuration from `PERSONBOOK_*` environment variables.
    ///
    /// # Errors
    /// - Returns `InvalidConfig` when the path or passphrase is missing, or the
    ///   policy value is unknown.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup(ENV_DB_PATH)
            .ok_or_else(|| DbError::InvalidConfig(format!("{ENV_DB_PATH} is not set")))?;
        let path = normalize_db_path(&path)?;
        let passphrase = lookup(ENV_DB_PASSPHRASE)
            .ok_or_else(|| DbError::InvalidConfig(format!("{ENV_DB_PASSPHRASE} is not set")))?;
        let policy = match lookup(ENV_MIGRATION_POLICY) {
            Some(value) => parse_migration_policy(&value)?,
            None => MigrationPolicy::default(),
        };

        Ok(Self::file(path, Passphrase::new(passphrase)?).with_migration_policy(policy))
    }
}

fn normalize_db_path(path: &str) -> DbResult<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(DbError::InvalidConfig("db path cannot be empty".to_string()));
    }
    Ok(PathBuf::from(trimmed))
}

fn parse_migration_policy(value: &str) -> DbResult<MigrationPolicy> {
    match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "fail-closed" => Ok(MigrationPolicy::FailClosed),
        "destructive-recreate" => Ok(MigrationPolicy::DestructiveRecreate),
        other => Err(DbError::InvalidConfig(format!(
            "unsupported migration policy `{other}`; expected fail-closed|destructive-recreate"
        ))),
    }
}
