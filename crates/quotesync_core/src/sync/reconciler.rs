//! Sync use-case service: reconciliation runs and manual conflict resolution.
//!
//! # Responsibility
//! - Fetch the remote collection, optionally push local state, merge, detect
//!   conflicts and persist the merged collection into a `QuoteBook`.
//! - Hold pending conflicts and the user-visible sync status.
//!
//! # Invariants
//! - A failed fetch leaves local state and pending conflicts untouched.
//! - A failed push during `sync` is logged and never fails the run.
//! - Each successful `sync` replaces the pending conflict list.
//! - The reconciler is driven through `&mut self`, so runs never overlap.

use crate::model::conflict::{Conflict, ConflictId, Resolution};
use crate::model::quote::{parse_quote_list, Quote};
use crate::repo::kv_repo::KvRepository;
use crate::service::quote_book::QuoteBook;
use crate::sync::reconcile::{detect_conflicts, merge_remote_first};
use crate::sync::remote::{QuoteRemote, RemoteError};
use chrono::{DateTime, Local};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type SyncResult<T> = Result<T, SyncError>;

/// Sync-level failure.
#[derive(Debug)]
pub enum SyncError {
    Remote(RemoteError),
    ConflictNotFound(String),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(err) => write!(f, "{err}"),
            Self::ConflictNotFound(reference) => write!(f, "conflict not found: {reference}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote(err) => Some(err),
            Self::ConflictNotFound(_) => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

/// User-visible sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Never,
    Syncing,
    Synced { at: DateTime<Local> },
    Failed { reason: String },
}

impl SyncStatus {
    pub fn label(&self) -> String {
        match self {
            Self::Never => "Last sync: never".to_string(),
            Self::Syncing => "Last sync: syncing...".to_string(),
            Self::Synced { at } => format!("Last sync: {}", at.format("%Y-%m-%d %H:%M:%S")),
            Self::Failed { .. } => "Last sync: failed".to_string(),
        }
    }
}

/// Options for one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Push local quotes to the remote after fetching (best effort).
    pub push_local: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { push_local: true }
    }
}

/// Result of a successful reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// New local state.
    pub merged: Vec<Quote>,
    /// Number of conflicts detected in this run.
    pub conflicts: usize,
    /// Whether the best-effort push succeeded (`false` when skipped).
    pub pushed: bool,
}

/// Reconciliation service over one remote endpoint.
pub struct Reconciler<R: QuoteRemote> {
    remote: R,
    conflicts: Vec<Conflict>,
    status: SyncStatus,
}

impl<R: QuoteRemote> Reconciler<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            conflicts: Vec::new(),
            status: SyncStatus::Never,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Runs one reconciliation against the remote.
    ///
    /// # Errors
    /// - `SyncError::Remote` when the fetch fails; status becomes `Failed`
    ///   and `book` is not modified.
    pub async fn sync<K: KvRepository>(
        &mut self,
        book: &mut QuoteBook<K>,
        options: SyncOptions,
    ) -> SyncResult<SyncReport> {
        let started_at = Instant::now();
        self.status = SyncStatus::Syncing;
        info!(
            "event=sync module=sync status=start push_local={} local_count={}",
            options.push_local,
            book.len()
        );

        let payload = match self.remote.fetch_all().await {
            Ok(payload) => payload,
            Err(err) => {
                error!(
                    "event=sync module=sync status=error duration_ms={} error_code=fetch_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.status = SyncStatus::Failed {
                    reason: err.to_string(),
                };
                return Err(err.into());
            }
        };
        let remote_quotes = parse_quote_list(&payload);

        let pushed = if options.push_local {
            match self.remote.push(book.quotes()).await {
                Ok(_) => true,
                Err(err) => {
                    warn!("event=sync_push module=sync status=error error={err}");
                    false
                }
            }
        } else {
            false
        };

        self.conflicts = detect_conflicts(book.quotes(), &remote_quotes);
        let merged = merge_remote_first(book.quotes(), &remote_quotes);
        book.replace_all(merged.clone());
        self.status = SyncStatus::Synced { at: Local::now() };

        info!(
            "event=sync module=sync status=ok duration_ms={} remote_count={} merged_count={} conflicts={} pushed={}",
            started_at.elapsed().as_millis(),
            remote_quotes.len(),
            merged.len(),
            self.conflicts.len(),
            pushed
        );
        Ok(SyncReport {
            conflicts: self.conflicts.len(),
            merged,
            pushed,
        })
    }

    /// Resolves the conflict at `index` (display order).
    pub fn resolve<K: KvRepository>(
        &mut self,
        book: &mut QuoteBook<K>,
        index: usize,
        resolution: Resolution,
    ) -> SyncResult<Conflict> {
        if index >= self.conflicts.len() {
            return Err(SyncError::ConflictNotFound(format!("#{index}")));
        }
        let conflict = self.conflicts.remove(index);
        apply_resolution(book, &conflict, resolution);
        Ok(conflict)
    }

    /// Resolves the conflict with the given stable id.
    pub fn resolve_by_id<K: KvRepository>(
        &mut self,
        book: &mut QuoteBook<K>,
        id: ConflictId,
        resolution: Resolution,
    ) -> SyncResult<Conflict> {
        let index = self
            .conflicts
            .iter()
            .position(|conflict| conflict.id == id)
            .ok_or_else(|| SyncError::ConflictNotFound(id.to_string()))?;
        self.resolve(book, index, resolution)
    }

    /// Replaces local state with remote ∪ (local − remote keys) and clears
    /// every pending conflict.
    ///
    /// # Errors
    /// - `SyncError::Remote` when the fetch fails; nothing changes.
    pub async fn accept_all_server<K: KvRepository>(
        &mut self,
        book: &mut QuoteBook<K>,
    ) -> SyncResult<usize> {
        let payload = self.remote.fetch_all().await.map_err(|err| {
            warn!("event=accept_all_server module=sync status=error error={err}");
            err
        })?;
        let remote_quotes = parse_quote_list(&payload);
        let merged = merge_remote_first(book.quotes(), &remote_quotes);
        book.replace_all(merged);

        let cleared = std::mem::take(&mut self.conflicts).len();
        self.status = SyncStatus::Synced { at: Local::now() };
        info!(
            "event=accept_all_server module=sync status=ok cleared={} count={}",
            cleared,
            book.len()
        );
        Ok(cleared)
    }

    /// Pushes local state and clears pending conflicts without touching it.
    ///
    /// # Errors
    /// - `SyncError::Remote` when the push fails; conflicts are kept.
    pub async fn keep_all_local<K: KvRepository>(
        &mut self,
        book: &mut QuoteBook<K>,
    ) -> SyncResult<usize> {
        self.remote.push(book.quotes()).await.map_err(|err| {
            warn!("event=keep_all_local module=sync status=error error={err}");
            err
        })?;

        let cleared = std::mem::take(&mut self.conflicts).len();
        self.status = SyncStatus::Synced { at: Local::now() };
        info!(
            "event=keep_all_local module=sync status=ok cleared={} count={}",
            cleared,
            book.len()
        );
        Ok(cleared)
    }
}

fn apply_resolution<K: KvRepository>(
    book: &mut QuoteBook<K>,
    conflict: &Conflict,
    resolution: Resolution,
) {
    match resolution {
        Resolution::AcceptServer => {
            book.remove_by_key(&conflict.local.key());
            book.push_if_absent(conflict.server.clone());
        }
        Resolution::KeepLocal => {
            book.remove_by_key(&conflict.server.key());
        }
    }
    info!(
        "event=conflict_resolve module=sync status=ok resolution={:?} count={}",
        resolution,
        book.len()
    );
}

#[cfg(test)]
mod tests {
    use super::{Reconciler, SyncError, SyncOptions, SyncStatus};
    use crate::config::ServerConfig;
    use crate::model::conflict::Resolution;
    use crate::model::quote::Quote;
    use crate::repo::kv_repo::{KvRepository, MemoryKvRepository, Namespace, QUOTES_KEY};
    use crate::service::quote_book::QuoteBook;
    use crate::sync::remote::SimulatedServer;

    fn q(text: &str, category: &str) -> Quote {
        Quote::new(text, category).unwrap()
    }

    fn book_of(quotes: &[Quote]) -> QuoteBook<MemoryKvRepository> {
        let repo = MemoryKvRepository::new();
        repo.put(
            Namespace::Durable,
            QUOTES_KEY,
            &serde_json::to_string(quotes).unwrap(),
        )
        .unwrap();
        QuoteBook::load(repo)
    }

    fn reconciler_with(remote: &[Quote]) -> Reconciler<SimulatedServer> {
        Reconciler::new(SimulatedServer::with_quotes(
            remote.to_vec(),
            ServerConfig::instant(5),
        ))
    }

    #[tokio::test]
    async fn sync_merges_remote_first_and_records_conflict() {
        let mut book = book_of(&[q("Q", "C1")]);
        let mut reconciler = reconciler_with(&[q("Q", "C2")]);

        let report = reconciler
            .sync(&mut book, SyncOptions { push_local: false })
            .await
            .unwrap();

        assert_eq!(report.merged, vec![q("Q", "C2"), q("Q", "C1")]);
        assert_eq!(report.conflicts, 1);
        assert!(!report.pushed);
        assert_eq!(book.quotes(), report.merged.as_slice());
        assert_eq!(reconciler.conflicts()[0].local, q("Q", "C1"));
        assert_eq!(reconciler.conflicts()[0].server, q("Q", "C2"));
        assert!(matches!(reconciler.status(), SyncStatus::Synced { .. }));
    }

    #[tokio::test]
    async fn sync_pushes_local_quotes_when_requested() {
        let mut book = book_of(&[q("local", "L")]);
        let mut reconciler = reconciler_with(&[q("remote", "R")]);

        let report = reconciler.sync(&mut book, SyncOptions::default()).await.unwrap();
        assert!(report.pushed);
        assert!(reconciler.remote().snapshot().contains(&q("local", "L")));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_state_untouched() {
        let mut book = book_of(&[q("a", "b")]);
        let mut reconciler = Reconciler::new(SimulatedServer::new(ServerConfig {
            failure_probability: 1.0,
            ..ServerConfig::instant(5)
        }));

        let err = reconciler
            .sync(&mut book, SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
        assert_eq!(book.quotes(), &[q("a", "b")]);
        assert_eq!(reconciler.status().label(), "Last sync: failed");
    }

    #[tokio::test]
    async fn accept_server_resolution_keeps_single_server_entry() {
        let mut book = book_of(&[q("Q", "C1")]);
        let mut reconciler = reconciler_with(&[q("Q", "C2")]);
        reconciler
            .sync(&mut book, SyncOptions { push_local: false })
            .await
            .unwrap();

        let resolved = reconciler
            .resolve(&mut book, 0, Resolution::AcceptServer)
            .unwrap();
        assert_eq!(resolved.server, q("Q", "C2"));
        assert_eq!(book.quotes(), &[q("Q", "C2")]);
        assert_eq!(reconciler.conflict_count(), 0);
    }

    #[tokio::test]
    async fn keep_local_resolution_drops_server_counterpart() {
        let mut book = book_of(&[q("Q", "C1")]);
        let mut reconciler = reconciler_with(&[q("Q", "C2")]);
        reconciler
            .sync(&mut book, SyncOptions { push_local: false })
            .await
            .unwrap();

        let id = reconciler.conflicts()[0].id;
        reconciler
            .resolve_by_id(&mut book, id, Resolution::KeepLocal)
            .unwrap();
        assert_eq!(book.quotes(), &[q("Q", "C1")]);
        assert!(matches!(
            reconciler.resolve(&mut book, 0, Resolution::KeepLocal),
            Err(SyncError::ConflictNotFound(_))
        ));
    }

    #[tokio::test]
    async fn keep_all_local_pushes_and_clears_conflicts() {
        let mut book = book_of(&[q("Q", "C1")]);
        let mut reconciler = reconciler_with(&[q("Q", "C2")]);
        reconciler
            .sync(&mut book, SyncOptions { push_local: false })
            .await
            .unwrap();
        let before = book.quotes().to_vec();

        let cleared = reconciler.keep_all_local(&mut book).await.unwrap();
        assert_eq!(cleared, 1);
        assert_eq!(book.quotes(), before.as_slice());
        assert!(reconciler.remote().snapshot().contains(&q("Q", "C1")));
    }

    #[tokio::test]
    async fn accept_all_server_unions_and_clears_conflicts() {
        let mut book = book_of(&[q("Q", "C1"), q("only", "local")]);
        let mut reconciler = reconciler_with(&[q("Q", "C2")]);
        reconciler
            .sync(&mut book, SyncOptions { push_local: false })
            .await
            .unwrap();

        reconciler.accept_all_server(&mut book).await.unwrap();
        assert_eq!(
            book.quotes(),
            &[q("Q", "C2"), q("Q", "C1"), q("only", "local")]
        );
        assert_eq!(reconciler.conflict_count(), 0);
    }

    #[test]
    fn status_labels() {
        assert_eq!(SyncStatus::Never.label(), "Last sync: never");
        assert_eq!(SyncStatus::Syncing.label(), "Last sync: syncing...");
    }
}
