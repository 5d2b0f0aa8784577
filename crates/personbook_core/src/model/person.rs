//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical contact record persisted in `persons`.
//! - Offer the form validation rules callers apply before writing.
//!
//! # Invariants
//! - `id == 0` means "not yet persisted"; the store assigns real IDs.
//! - Timestamps are Unix epoch milliseconds; `0` means "unset".
//! - `updated_at >= created_at` for every persisted row.
//! - The store does not call `validate()`; it is a caller-side contract.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned row identifier.
pub type PersonId = i64;

/// Marker value for a person that has not been inserted yet.
pub const UNSAVED_PERSON_ID: PersonId = 0;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Contact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Auto-increment row ID; `0` until first insert.
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// Must be positive; checked by `validate()` only.
    pub age: u32,
    /// Optional free text, empty when unknown.
    pub address: String,
    /// Non-negative; defaults to `0.0` (also for rows migrated from v1).
    pub salary: f64,
    /// Set once at first persistence.
    pub created_at: i64,
    /// Refreshed on every mutating write.
    pub updated_at: i64,
}

impl Person {
    /// Creates an unsaved person with empty address and zero salary.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        age: u32,
    ) -> Self {
        Self {
            id: UNSAVED_PERSON_ID,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: phone.into(),
            age,
            address: String::new(),
            salary: 0.0,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_salary(mut self, salary: f64) -> Self {
        self.salary = salary;
        self
    }

    /// Returns whether this value carries a store-assigned ID.
    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED_PERSON_ID
    }

    /// Human-readable "First Last" label.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Applies the add/edit form rules.
    ///
    /// # Errors
    /// - Returns the first failing rule in field order.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        require_non_blank("first_name", &self.first_name)?;
        require_non_blank("last_name", &self.last_name)?;
        require_non_blank("email", &self.email)?;
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(PersonValidationError::InvalidEmail(self.email.clone()));
        }
        require_non_blank("phone", &self.phone)?;
        if self.age == 0 {
            return Err(PersonValidationError::NonPositiveAge);
        }
        if !self.salary.is_finite() || self.salary < 0.0 {
            return Err(PersonValidationError::InvalidSalary(self.salary));
        }
        Ok(())
    }
}

/// Form validation failure for [`Person::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum PersonValidationError {
    MissingField(&'static str),
    InvalidEmail(String),
    NonPositiveAge,
    InvalidSalary(f64),
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::NonPositiveAge => write!(f, "age must be greater than zero"),
            Self::InvalidSalary(value) => {
                write!(f, "salary must be a non-negative number, got {value}")
            }
        }
    }
}

impl Error for PersonValidationError {}

fn require_non_blank(field: &'static str, value: &str) -> Result<(), PersonValidationError> {
    if value.trim().is_empty() {
        return Err(PersonValidationError::MissingField(field));
    }
    Ok(())
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
