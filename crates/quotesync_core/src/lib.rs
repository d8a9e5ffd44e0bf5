//! Core domain logic for quotesync.
//! This crate is the single source of truth for quote storage, import/export
//! and local/remote reconciliation.

pub mod app;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use app::{App, Command, CommandResponse};
pub use config::{AppConfig, ServerConfig};
pub use logging::{
    default_log_level, flush_logging, init_logging, logging_status, LoggingError,
};
pub use model::conflict::{Conflict, ConflictId, Resolution};
pub use model::quote::{
    default_quotes, is_valid_quote, parse_quote_list, Quote, QuoteKey, QuoteValidationError,
};
pub use repo::kv_repo::{
    KvRepository, MemoryKvRepository, Namespace, RepoError, RepoResult, SqliteKvRepository,
};
pub use service::quote_book::{QuoteBook, ALL_CATEGORIES};
pub use service::transfer::{
    export_json, export_to_dir, import_file, import_json, ImportError, ImportSummary,
};
pub use sync::reconcile::{detect_conflicts, merge_remote_first};
pub use sync::reconciler::{
    Reconciler, SyncError, SyncOptions, SyncReport, SyncResult, SyncStatus,
};
pub use sync::remote::{
    Mutation, QuoteRemote, RemoteError, RemoteResult, SimulatedServer, SERVER_CATEGORY,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
