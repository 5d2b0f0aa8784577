//! Domain model for contact records.
//!
//! # Responsibility
//! - Define the `Person` value shared by store, repository and view-state.
//! - Provide caller-side form validation helpers.
//!
//! # Invariants
//! - Every persisted person is identified by a store-assigned `PersonId`.
//! - Edits replace the whole value; the store never patches single fields.

pub mod person;
