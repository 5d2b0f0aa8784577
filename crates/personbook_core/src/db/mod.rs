//! Encrypted SQLite record store.
//!
//! # Responsibility
//! - Open and key SQLCipher connections for the person store.
//! - Apply schema migrations in deterministic order.
//! - Hand out shared store handles and publish change generations.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No person data is read or written before migrations succeed.
//! - A wrong passphrase surfaces as `AccessDenied`, never as an empty table.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod registry;
mod store;

pub use open::open_db;
pub use registry::StoreRegistry;
pub use store::PersonStore;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Store was never opened or has been closed.
    NotInitialized,
    /// Wrong passphrase, or the file is not an encrypted person store.
    AccessDenied,
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidConfig(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::NotInitialized => write!(f, "person store is not open"),
            Self::AccessDenied => write!(
                f,
                "access denied: wrong passphrase or unreadable store file"
            ),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidConfig(message) => write!(f, "invalid store config: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::NotADatabase) => Self::AccessDenied,
            _ => Self::Sqlite(value),
        }
    }
}
