//! Core data layer for PersonBook.
//! This crate is the single source of truth for contact records, their
//! encrypted storage and the list view-state fed from it.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod viewstate;

pub use config::{MigrationPolicy, Passphrase, StoreConfig, StoreLocation};
pub use db::{DbError, DbResult, PersonStore, StoreRegistry};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::person::{Person, PersonId, PersonValidationError};
pub use repo::live::LiveQuery;
pub use repo::person_repo::{
    PersonQuery, PersonRepository, RepoError, RepoResult, SalaryStats, SqlitePersonRepository,
};
pub use service::person_service::PersonService;
pub use viewstate::person_list::{PersonListController, PersonListState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
