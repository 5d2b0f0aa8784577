//! Person service facade.
//!
//! # Responsibility
//! - Provide the stable person API consumed by view-state controllers.
//! - Delegate every call to a repository implementation unchanged.
//!
//! # Invariants
//! - The service adds no behavior; contracts match `PersonRepository`.
//! - The service never reaches into the store directly.

use crate::db::PersonStore;
use crate::model::person::{Person, PersonId};
use crate::repo::live::LiveQuery;
use crate::repo::person_repo::{
    PersonQuery, PersonRepository, RepoResult, SalaryStats, SqlitePersonRepository,
};

/// Facade over person repository implementations.
#[derive(Debug, Clone)]
pub struct PersonService<R: PersonRepository> {
    repo: R,
}

impl PersonService<SqlitePersonRepository> {
    /// Builds a service over the SQLite repository for `store`.
    pub fn for_store(store: PersonStore) -> Self {
        Self::new(SqlitePersonRepository::new(store))
    }
}

impl<R: PersonRepository> PersonService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn insert(&self, person: &Person) -> RepoResult<PersonId> {
        self.repo.insert(person)
    }

    /// Returns rows affected; `0` means the ID does not exist.
    pub fn update(&self, person: &Person) -> RepoResult<usize> {
        self.repo.update(person)
    }

    pub fn delete(&self, person: &Person) -> RepoResult<usize> {
        self.repo.delete(person)
    }

    pub fn delete_by_id(&self, id: PersonId) -> RepoResult<usize> {
        self.repo.delete_by_id(id)
    }

    pub fn delete_all(&self) -> RepoResult<usize> {
        self.repo.delete_all()
    }

    pub fn get_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        self.repo.get_by_id(id)
    }

    pub fn list(&self, query: &PersonQuery) -> RepoResult<Vec<Person>> {
        self.repo.list(query)
    }

    pub fn count(&self) -> RepoResult<u64> {
        self.repo.count()
    }

    pub fn average_salary(&self) -> RepoResult<f64> {
        self.repo.average_salary()
    }

    pub fn max_salary(&self) -> RepoResult<f64> {
        self.repo.max_salary()
    }

    pub fn min_salary(&self) -> RepoResult<f64> {
        self.repo.min_salary()
    }

    pub fn salary_stats(&self) -> RepoResult<SalaryStats> {
        self.repo.salary_stats()
    }
}

impl<R> PersonService<R>
where
    R: PersonRepository + Clone + 'static,
{
    pub fn observe(&self, query: PersonQuery) -> RepoResult<LiveQuery<R>> {
        self.repo.observe(query)
    }

    pub fn observe_all(&self) -> RepoResult<LiveQuery<R>> {
        self.repo.observe_all()
    }

    pub fn observe_search(&self, text: &str) -> RepoResult<LiveQuery<R>> {
        self.repo.observe_search(text)
    }

    pub fn observe_by_salary(&self) -> RepoResult<LiveQuery<R>> {
        self.repo.observe_by_salary()
    }

    pub fn observe_by_min_salary(&self, min: f64) -> RepoResult<LiveQuery<R>> {
        self.repo.observe_by_min_salary(min)
    }
}
