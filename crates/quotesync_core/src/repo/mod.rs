//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value collaborator used by quote services.
//! - Isolate SQLite query details from service/sync orchestration.
//!
//! # Invariants
//! - Repository APIs never interpret stored values.

pub mod kv_repo;
