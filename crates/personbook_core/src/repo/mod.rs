//! Query gateway over the person store.
//!
//! # Responsibility
//! - Define typed read/write contracts for `persons`.
//! - Keep every SQL statement inside this module.
//! - Turn change generations into live, full-snapshot query streams.
//!
//! # Invariants
//! - Update/delete of a missing ID is a soft no-op (zero rows), not an error.
//! - List orderings are total so repeated reads of unchanged data agree.

pub mod live;
pub mod person_repo;
