//! Sync conflict model.
//!
//! # Invariants
//! - `local.text == server.text` and, when detection found a mismatch,
//!   `local.category != server.category`.
//! - Conflicts are transient: they live only until the next sync or an
//!   explicit resolution.

use crate::model::quote::Quote;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one pending conflict.
pub type ConflictId = Uuid;

/// Same-text, different-category divergence between local and remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub local: Quote,
    pub server: Quote,
}

impl Conflict {
    pub fn new(local: Quote, server: Quote) -> Self {
        Self {
            id: Uuid::new_v4(),
            local,
            server,
        }
    }
}

/// Manual resolution choice for one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Drop the local entry and make sure the server entry is present.
    AcceptServer,
    /// Drop the server counterpart from local state.
    KeepLocal,
}
