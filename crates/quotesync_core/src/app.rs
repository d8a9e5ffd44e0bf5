//! Command dispatch over the owned quote store and reconciler.
//!
//! # Responsibility
//! - Replace UI callbacks and timers with explicit `Command` values.
//! - Turn every outcome, including errors, into a user-facing response.
//!
//! # Invariants
//! - `dispatch` never panics and never propagates errors.
//! - Commands run one at a time through `&mut self`; a periodic sync can not
//!   interleave with another command.

use crate::model::conflict::Resolution;
use crate::repo::kv_repo::KvRepository;
use crate::service::quote_book::{QuoteBook, ALL_CATEGORIES};
use crate::service::transfer::{export_to_dir, import_file};
use crate::sync::reconciler::{Reconciler, SyncOptions};
use crate::sync::remote::QuoteRemote;
use chrono::Utc;
use rand::rngs::StdRng;
use std::path::PathBuf;

/// User intent routed through `App::dispatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowRandom,
    SetFilter(String),
    ListCategories,
    ListQuotes,
    AddQuote { text: String, category: String },
    Export { dir: PathBuf },
    Import { path: PathBuf },
    Sync { push_local: bool },
    ListConflicts,
    Resolve { index: usize, resolution: Resolution },
    AcceptAllServer,
    KeepAllLocal,
    Status,
    LastViewed,
}

/// Response envelope for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Human-readable summary.
    pub message: String,
    /// Optional detail lines (listings).
    pub lines: Vec<String>,
}

impl CommandResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            lines: Vec::new(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            lines: Vec::new(),
        }
    }

    fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = lines;
        self
    }
}

/// Application state: local store, reconciler and display RNG.
pub struct App<K: KvRepository, R: QuoteRemote> {
    book: QuoteBook<K>,
    reconciler: Reconciler<R>,
    rng: StdRng,
}

impl<K: KvRepository, R: QuoteRemote> App<K, R> {
    pub fn new(book: QuoteBook<K>, reconciler: Reconciler<R>, rng: StdRng) -> Self {
        Self {
            book,
            reconciler,
            rng,
        }
    }

    pub fn book(&self) -> &QuoteBook<K> {
        &self.book
    }

    pub fn reconciler(&self) -> &Reconciler<R> {
        &self.reconciler
    }

    /// Executes one command.
    pub async fn dispatch(&mut self, command: Command) -> CommandResponse {
        match command {
            Command::ShowRandom => self.show_random(),
            Command::SetFilter(category) => {
                if self.book.set_filter(&category) {
                    self.show_random()
                } else {
                    CommandResponse::failure(format!("Unknown category: {}", category.trim()))
                }
            }
            Command::ListCategories => {
                let mut lines = vec![ALL_CATEGORIES.to_string()];
                lines.extend(self.book.categories());
                CommandResponse::success(format!("Active filter: {}", self.book.filter()))
                    .with_lines(lines)
            }
            Command::ListQuotes => {
                let lines = self
                    .book
                    .quotes()
                    .iter()
                    .map(|quote| quote.display_line())
                    .collect::<Vec<_>>();
                CommandResponse::success(format!("{} quote(s).", lines.len())).with_lines(lines)
            }
            Command::AddQuote { text, category } => match self.book.add_quote(text, category) {
                Ok(_) => CommandResponse::success("Added!"),
                Err(_) => CommandResponse::failure("Please fill both fields."),
            },
            Command::Export { dir } => match export_to_dir(&self.book, &dir, Utc::now()) {
                Ok(path) => CommandResponse::success(format!("Exported to {}", path.display())),
                Err(err) => CommandResponse::failure(format!("Export failed: {err}")),
            },
            Command::Import { path } => match import_file(&mut self.book, &path) {
                Ok(summary) => CommandResponse::success(summary.message()),
                Err(err) => CommandResponse::failure(err.to_string()),
            },
            Command::Sync { push_local } => {
                match self
                    .reconciler
                    .sync(&mut self.book, SyncOptions { push_local })
                    .await
                {
                    Ok(report) if report.conflicts > 0 => CommandResponse::success(format!(
                        "{} Review Conflicts ({})",
                        self.reconciler.status().label(),
                        report.conflicts
                    )),
                    Ok(_) => CommandResponse::success(self.reconciler.status().label()),
                    Err(_) => CommandResponse::failure(self.reconciler.status().label()),
                }
            }
            Command::ListConflicts => {
                let lines = self
                    .reconciler
                    .conflicts()
                    .iter()
                    .enumerate()
                    .map(|(index, conflict)| {
                        format!(
                            "#{index} local: {} | server: {}",
                            conflict.local.display_line(),
                            conflict.server.display_line()
                        )
                    })
                    .collect::<Vec<_>>();
                let message = if lines.is_empty() {
                    "No conflicts.".to_string()
                } else {
                    format!("{} conflict(s).", lines.len())
                };
                CommandResponse::success(message).with_lines(lines)
            }
            Command::Resolve { index, resolution } => {
                match self.reconciler.resolve(&mut self.book, index, resolution) {
                    Ok(_) => CommandResponse::success(format!(
                        "Resolved. {} conflict(s) remaining.",
                        self.reconciler.conflict_count()
                    )),
                    Err(err) => CommandResponse::failure(err.to_string()),
                }
            }
            Command::AcceptAllServer => {
                match self.reconciler.accept_all_server(&mut self.book).await {
                    Ok(cleared) => CommandResponse::success(format!(
                        "Accepted server data; cleared {cleared} conflict(s)."
                    )),
                    Err(err) => {
                        CommandResponse::failure(format!("Failed to accept all server: {err}"))
                    }
                }
            }
            Command::KeepAllLocal => match self.reconciler.keep_all_local(&mut self.book).await {
                Ok(cleared) => CommandResponse::success(format!(
                    "Kept local data; cleared {cleared} conflict(s)."
                )),
                Err(err) => CommandResponse::failure(format!("Failed to push local: {err}")),
            },
            Command::Status => CommandResponse::success(self.reconciler.status().label())
                .with_lines(vec![
                    format!("quotes={}", self.book.len()),
                    format!("conflicts={}", self.reconciler.conflict_count()),
                    format!("filter={}", self.book.filter()),
                ]),
            Command::LastViewed => match self.book.last_viewed() {
                Some(quote) => CommandResponse::success(quote.display_line()),
                None => CommandResponse::success("none"),
            },
        }
    }

    fn show_random(&mut self) -> CommandResponse {
        match self.book.random_quote(&mut self.rng) {
            Some(quote) => CommandResponse::success(quote.display_line()),
            None => CommandResponse::failure("No quotes available for this category."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{App, Command};
    use crate::config::ServerConfig;
    use crate::model::conflict::Resolution;
    use crate::model::quote::Quote;
    use crate::repo::kv_repo::{KvRepository, MemoryKvRepository, Namespace, QUOTES_KEY};
    use crate::service::quote_book::QuoteBook;
    use crate::sync::reconciler::Reconciler;
    use crate::sync::remote::SimulatedServer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn app_with(
        local: &str,
        remote: Vec<Quote>,
    ) -> App<MemoryKvRepository, SimulatedServer> {
        let repo = MemoryKvRepository::new();
        repo.put(Namespace::Durable, QUOTES_KEY, local).unwrap();
        App::new(
            QuoteBook::load(repo),
            Reconciler::new(SimulatedServer::with_quotes(remote, ServerConfig::instant(2))),
            StdRng::seed_from_u64(2),
        )
    }

    #[tokio::test]
    async fn add_rejects_blank_fields_with_message() {
        let mut app = app_with("[]", Vec::new());
        let response = app
            .dispatch(Command::AddQuote {
                text: " ".to_string(),
                category: "x".to_string(),
            })
            .await;
        assert!(!response.ok);
        assert_eq!(response.message, "Please fill both fields.");
    }

    #[tokio::test]
    async fn show_random_on_empty_filter_reports_no_quotes() {
        let mut app = app_with("[]", Vec::new());
        let response = app.dispatch(Command::ShowRandom).await;
        assert!(!response.ok);
        assert_eq!(response.message, "No quotes available for this category.");
    }

    #[tokio::test]
    async fn sync_then_resolve_through_commands() {
        let mut app = app_with(
            r#"[{"text":"Q","category":"C1"}]"#,
            vec![Quote::new("Q", "C2").unwrap()],
        );

        let synced = app.dispatch(Command::Sync { push_local: false }).await;
        assert!(synced.ok);
        assert!(synced.message.contains("Review Conflicts (1)"));

        let listed = app.dispatch(Command::ListConflicts).await;
        assert_eq!(listed.lines.len(), 1);

        let resolved = app
            .dispatch(Command::Resolve {
                index: 0,
                resolution: Resolution::AcceptServer,
            })
            .await;
        assert!(resolved.ok, "{}", resolved.message);
        assert_eq!(app.book().quotes(), &[Quote::new("Q", "C2").unwrap()]);

        let missing = app
            .dispatch(Command::Resolve {
                index: 0,
                resolution: Resolution::KeepLocal,
            })
            .await;
        assert!(!missing.ok);
    }

    #[tokio::test]
    async fn set_filter_rejects_unknown_category() {
        let mut app = app_with(r#"[{"text":"a","category":"Life"}]"#, Vec::new());
        assert!(!app.dispatch(Command::SetFilter("Work".to_string())).await.ok);
        let shown = app.dispatch(Command::SetFilter("Life".to_string())).await;
        assert!(shown.ok);
        assert_eq!(shown.message, "\"a\" - Life");

        let last = app.dispatch(Command::LastViewed).await;
        assert_eq!(last.message, "\"a\" - Life");
    }
}
