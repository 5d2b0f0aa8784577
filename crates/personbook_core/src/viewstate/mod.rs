//! UI-agnostic view-state controllers.
//!
//! # Responsibility
//! - Bridge live repository queries to observable state for a host UI.
//! - Convert every core error into a displayable message at this boundary.

pub mod person_list;
