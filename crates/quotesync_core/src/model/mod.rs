//! Domain model for quotes and sync conflicts.
//!
//! # Responsibility
//! - Define canonical data structures used by storage, services and sync.
//!
//! # Invariants
//! - Every persisted quote passed `Quote::new` validation.
//! - Quote identity is the `text||category` key, never a positional index.

pub mod conflict;
pub mod quote;
