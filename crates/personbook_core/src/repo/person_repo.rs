//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/delete/select/aggregate APIs over `persons`.
//! - Define ordering and filter semantics for list queries.
//!
//! # Invariants
//! - Lists are ordered `created_at DESC, id DESC`; salary lists by
//!   `salary DESC` first.
//! - Search is a case-sensitive substring match on first name, last name or
//!   email.
//! - Aggregates over an empty table return `0` / `0.0`.
//! - Write paths never touch `created_at` of an existing row and keep
//!   `updated_at >= created_at`.

use crate::db::{DbError, PersonStore};
use crate::model::person::{now_epoch_ms, Person, PersonId};
use crate::repo::live::LiveQuery;
use rusqlite::{params, Connection, ErrorCode, Row};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::watch;

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    email,
    phone,
    age,
    address,
    salary,
    created_at,
    updated_at
FROM persons";

const NEWEST_FIRST: &str = " ORDER BY created_at DESC, id DESC";
const HIGHEST_SALARY_FIRST: &str = " ORDER BY salary DESC, created_at DESC, id DESC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A SQL constraint rejected the write; the operation was aborted.
    ConstraintViolation(String),
    InvalidData(String),
    /// Blocking worker panicked or was cancelled before returning.
    Worker(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::Worker(message) => write!(f, "store worker failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(value.to_string()),
            _ => Self::Db(DbError::from(value)),
        }
    }
}

/// List query shapes supported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PersonQuery {
    /// Every row, newest first.
    All,
    /// Substring match on first name, last name or email, newest first.
    Search(String),
    /// Every row, highest salary first.
    BySalary,
    /// Rows with `salary >= min`, highest salary first.
    MinSalary(f64),
}

impl PersonQuery {
    /// Builds a search query; empty text is the same as [`PersonQuery::All`].
    pub fn search(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::All
        } else {
            Self::Search(text)
        }
    }
}

/// One-shot salary aggregates over the full table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SalaryStats {
    pub count: u64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

/// Repository interface for person operations.
pub trait PersonRepository: Send + Sync {
    /// Inserts a person; `id == 0` gets a fresh ID, an explicit ID upserts.
    fn insert(&self, person: &Person) -> RepoResult<PersonId>;
    /// Replaces the row with `person.id`; returns rows affected.
    fn update(&self, person: &Person) -> RepoResult<usize>;
    fn delete_by_id(&self, id: PersonId) -> RepoResult<usize>;
    fn delete_all(&self) -> RepoResult<usize>;
    fn get_by_id(&self, id: PersonId) -> RepoResult<Option<Person>>;
    /// One-shot read of a list query.
    fn list(&self, query: &PersonQuery) -> RepoResult<Vec<Person>>;
    fn count(&self) -> RepoResult<u64>;
    fn salary_stats(&self) -> RepoResult<SalaryStats>;
    /// Receiver of store change generations, used by live queries.
    fn subscribe_changes(&self) -> RepoResult<watch::Receiver<u64>>;

    fn delete(&self, person: &Person) -> RepoResult<usize> {
        self.delete_by_id(person.id)
    }

    fn average_salary(&self) -> RepoResult<f64> {
        Ok(self.salary_stats()?.average)
    }

    fn max_salary(&self) -> RepoResult<f64> {
        Ok(self.salary_stats()?.max)
    }

    fn min_salary(&self) -> RepoResult<f64> {
        Ok(self.salary_stats()?.min)
    }

    /// Starts a live query that re-emits `query` after every change.
    fn observe(&self, query: PersonQuery) -> RepoResult<LiveQuery<Self>>
    where
        Self: Clone + Sized + 'static,
    {
        LiveQuery::start(self.clone(), query)
    }

    fn observe_all(&self) -> RepoResult<LiveQuery<Self>>
    where
        Self: Clone + Sized + 'static,
    {
        self.observe(PersonQuery::All)
    }

    fn observe_search(&self, text: &str) -> RepoResult<LiveQuery<Self>>
    where
        Self: Clone + Sized + 'static,
    {
        self.observe(PersonQuery::search(text))
    }

    fn observe_by_salary(&self) -> RepoResult<LiveQuery<Self>>
    where
        Self: Clone + Sized + 'static,
    {
        self.observe(PersonQuery::BySalary)
    }

    fn observe_by_min_salary(&self, min: f64) -> RepoResult<LiveQuery<Self>>
    where
        Self: Clone + Sized + 'static,
    {
        self.observe(PersonQuery::MinSalary(min))
    }
}

/// SQLite-backed person repository.
#[derive(Debug, Clone)]
pub struct SqlitePersonRepository {
    store: PersonStore,
}

impl SqlitePersonRepository {
    pub fn new(store: PersonStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &PersonStore {
        &self.store
    }
}

impl PersonRepository for SqlitePersonRepository {
    fn insert(&self, person: &Person) -> RepoResult<PersonId> {
        let now = now_epoch_ms();
        let created_at = if person.created_at > 0 {
            person.created_at
        } else {
            now
        };
        let updated_at = if person.updated_at > 0 {
            person.updated_at
        } else {
            now
        }
        .max(created_at);

        self.store.write(|conn| {
            if person.is_persisted() {
                // An existing row keeps its first-persistence `created_at`.
                conn.execute(
                    "INSERT INTO persons (
                        id,
                        first_name,
                        last_name,
                        email,
                        phone,
                        age,
                        address,
                        salary,
                        created_at,
                        updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(id) DO UPDATE SET
                        first_name = excluded.first_name,
                        last_name = excluded.last_name,
                        email = excluded.email,
                        phone = excluded.phone,
                        age = excluded.age,
                        address = excluded.address,
                        salary = excluded.salary,
                        updated_at = max(excluded.updated_at, persons.created_at);",
                    params![
                        person.id,
                        person.first_name.as_str(),
                        person.last_name.as_str(),
                        person.email.as_str(),
                        person.phone.as_str(),
                        i64::from(person.age),
                        person.address.as_str(),
                        person.salary,
                        created_at,
                        updated_at,
                    ],
                )?;
                return Ok(person.id);
            }

            conn.execute(
                "INSERT INTO persons (
                    first_name,
                    last_name,
                    email,
                    phone,
                    age,
                    address,
                    salary,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    person.first_name.as_str(),
                    person.last_name.as_str(),
                    person.email.as_str(),
                    person.phone.as_str(),
                    i64::from(person.age),
                    person.address.as_str(),
                    person.salary,
                    created_at,
                    updated_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn update(&self, person: &Person) -> RepoResult<usize> {
        let now = now_epoch_ms();
        self.store.write(|conn| {
            let changed = conn.execute(
                "UPDATE persons
                 SET
                    first_name = ?1,
                    last_name = ?2,
                    email = ?3,
                    phone = ?4,
                    age = ?5,
                    address = ?6,
                    salary = ?7,
                    updated_at = max(?8, created_at)
                 WHERE id = ?9;",
                params![
                    person.first_name.as_str(),
                    person.last_name.as_str(),
                    person.email.as_str(),
                    person.phone.as_str(),
                    i64::from(person.age),
                    person.address.as_str(),
                    person.salary,
                    now,
                    person.id,
                ],
            )?;
            Ok(changed)
        })
    }

    fn delete_by_id(&self, id: PersonId) -> RepoResult<usize> {
        self.store.write(|conn| {
            let changed = conn.execute("DELETE FROM persons WHERE id = ?1;", [id])?;
            Ok(changed)
        })
    }

    fn delete_all(&self) -> RepoResult<usize> {
        self.store.write(|conn| {
            let changed = conn.execute("DELETE FROM persons;", [])?;
            Ok(changed)
        })
    }

    fn get_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        self.store.read(|conn| {
            let mut stmt = conn.prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1;"))?;
            let mut rows = stmt.query([id])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_person_row(row)?));
            }
            Ok(None)
        })
    }

    fn list(&self, query: &PersonQuery) -> RepoResult<Vec<Person>> {
        self.store.read(|conn| list_persons(conn, query))
    }

    fn count(&self) -> RepoResult<u64> {
        self.store.read(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM persons;", [], |row| row.get(0))?;
            non_negative_count(count)
        })
    }

    fn salary_stats(&self) -> RepoResult<SalaryStats> {
        self.store.read(|conn| {
            let (count, average, max, min): (i64, f64, f64, f64) = conn.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(AVG(salary), 0.0),
                    COALESCE(MAX(salary), 0.0),
                    COALESCE(MIN(salary), 0.0)
                 FROM persons;",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
            Ok(SalaryStats {
                count: non_negative_count(count)?,
                average,
                max,
                min,
            })
        })
    }

    fn subscribe_changes(&self) -> RepoResult<watch::Receiver<u64>> {
        Ok(self.store.subscribe_changes()?)
    }
}

fn list_persons(conn: &Connection, query: &PersonQuery) -> RepoResult<Vec<Person>> {
    let mut persons = Vec::new();
    match query {
        PersonQuery::All => {
            let mut stmt = conn.prepare(&format!("{PERSON_SELECT_SQL}{NEWEST_FIRST};"))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                persons.push(parse_person_row(row)?);
            }
        }
        PersonQuery::Search(text) => {
            // instr() keeps the match case-sensitive; LIKE would fold ASCII case.
            let mut stmt = conn.prepare(&format!(
                "{PERSON_SELECT_SQL}
                 WHERE instr(first_name, ?1) > 0
                    OR instr(last_name, ?1) > 0
                    OR instr(email, ?1) > 0
                 {NEWEST_FIRST};"
            ))?;
            let mut rows = stmt.query([text.as_str()])?;
            while let Some(row) = rows.next()? {
                persons.push(parse_person_row(row)?);
            }
        }
        PersonQuery::BySalary => {
            let mut stmt = conn.prepare(&format!("{PERSON_SELECT_SQL}{HIGHEST_SALARY_FIRST};"))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                persons.push(parse_person_row(row)?);
            }
        }
        PersonQuery::MinSalary(min) => {
            let mut stmt = conn.prepare(&format!(
                "{PERSON_SELECT_SQL} WHERE salary >= ?1{HIGHEST_SALARY_FIRST};"
            ))?;
            let mut rows = stmt.query([*min])?;
            while let Some(row) = rows.next()? {
                persons.push(parse_person_row(row)?);
            }
        }
    }
    Ok(persons)
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let age_value: i64 = row.get("age")?;
    let age = u32::try_from(age_value).map_err(|_| {
        RepoError::InvalidData(format!("invalid age value `{age_value}` in persons.age"))
    })?;

    Ok(Person {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        age,
        address: row.get("address")?,
        salary: row.get("salary")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn non_negative_count(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative row count `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::PersonQuery;

    #[test]
    fn empty_search_is_all() {
        assert_eq!(PersonQuery::search(""), PersonQuery::All);
        assert_eq!(
            PersonQuery::search("Lee"),
            PersonQuery::Search("Lee".to_string())
        );
    }

    #[test]
    fn whitespace_search_is_kept_literal() {
        assert_eq!(
            PersonQuery::search(" "),
            PersonQuery::Search(" ".to_string())
        );
    }
}
