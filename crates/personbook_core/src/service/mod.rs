//! Core use-case services.
//!
//! # Responsibility
//! - Expose repository operations to view-state and host callers.
//! - Keep callers decoupled from store construction details.

pub mod person_service;
