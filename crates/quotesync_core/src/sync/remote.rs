//! Remote quote source contract and the in-process simulated server.
//!
//! # Responsibility
//! - Define the asynchronous fetch/push seam used by the reconciler.
//! - Provide `SimulatedServer`: an independently mutating in-memory
//!   collection with artificial latency and optional failure injection.
//!
//! # Invariants
//! - Payloads are raw JSON as they would arrive over the wire; callers
//!   validate them.
//! - `push` appends only quotes whose trimmed key is absent on the server.
//! - The server lock is never held across an await point.

use crate::config::ServerConfig;
use crate::model::quote::{default_quotes, quotes_to_value, Quote};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Category used for server-originated inserts and category rewrites.
pub const SERVER_CATEGORY: &str = "Server";

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Endpoint could not be reached.
    Unavailable(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(details) => write!(f, "remote unavailable: {details}"),
        }
    }
}

impl Error for RemoteError {}

/// Asynchronous remote quote endpoint.
#[async_trait]
pub trait QuoteRemote: Send + Sync {
    /// Returns the full server collection as a JSON payload.
    async fn fetch_all(&self) -> RemoteResult<Value>;
    /// Sends the local collection; returns the server collection afterwards.
    async fn push(&self, quotes: &[Quote]) -> RemoteResult<Value>;
}

#[async_trait]
impl<T: QuoteRemote + ?Sized> QuoteRemote for Arc<T> {
    async fn fetch_all(&self) -> RemoteResult<Value> {
        (**self).fetch_all().await
    }

    async fn push(&self, quotes: &[Quote]) -> RemoteResult<Value> {
        (**self).push(quotes).await
    }
}

/// One change applied by `SimulatedServer::mutate_once`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Inserted(Quote),
    TextRewritten { before: Quote, after: Quote },
    CategoryRewritten { before: Quote, after: Quote },
}

impl Mutation {
    fn label(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "insert",
            Self::TextRewritten { .. } => "text_rewrite",
            Self::CategoryRewritten { .. } => "category_rewrite",
        }
    }
}

struct ServerState {
    quotes: Vec<Quote>,
    rng: StdRng,
}

/// In-memory stand-in for a quote backend.
pub struct SimulatedServer {
    state: Mutex<ServerState>,
    config: ServerConfig,
}

impl SimulatedServer {
    /// Creates a server seeded with the default quotes.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_quotes(default_quotes(), config)
    }

    /// Creates a server holding `quotes`.
    pub fn with_quotes(quotes: Vec<Quote>, config: ServerConfig) -> Self {
        let config = config.normalized();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state: Mutex::new(ServerState { quotes, rng }),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Copy of the current server collection.
    pub fn snapshot(&self) -> Vec<Quote> {
        self.lock().quotes.clone()
    }

    /// Overwrites the server collection.
    pub fn replace(&self, quotes: Vec<Quote>) {
        self.lock().quotes = quotes;
    }

    /// Applies at most one random change, governed by `mutation_probability`.
    ///
    /// An empty server always receives an insert when a change happens.
    pub fn mutate_once(&self) -> Option<Mutation> {
        let mut state = self.lock();
        let ServerState { quotes, rng } = &mut *state;

        if !rng.gen_bool(self.config.mutation_probability) {
            return None;
        }

        let rewrite_index = if quotes.is_empty() || rng.gen_bool(0.5) {
            None
        } else {
            Some(rng.gen_range(0..quotes.len()))
        };
        let rewrite_text = rng.gen_bool(0.5);

        let mutation = match rewrite_index {
            Some(index) if rewrite_text => {
                let before = quotes[index].clone();
                let after = Quote {
                    text: format!("{} (updated remotely)", before.text),
                    category: before.category.clone(),
                };
                quotes[index] = after.clone();
                Mutation::TextRewritten { before, after }
            }
            // Rewriting a quote already under `Server` would change nothing; insert instead.
            Some(index) if quotes[index].category != SERVER_CATEGORY => {
                let before = quotes[index].clone();
                let after = Quote {
                    text: before.text.clone(),
                    category: SERVER_CATEGORY.to_string(),
                };
                quotes[index] = after.clone();
                Mutation::CategoryRewritten { before, after }
            }
            _ => {
                let inserted = Quote {
                    text: format!("Server quote {}", Utc::now().timestamp_millis()),
                    category: SERVER_CATEGORY.to_string(),
                };
                quotes.push(inserted.clone());
                Mutation::Inserted(inserted)
            }
        };

        info!(
            "event=server_mutate module=remote status=ok kind={} count={}",
            mutation.label(),
            quotes.len()
        );
        Some(mutation)
    }

    /// Spawns a task calling `mutate_once` every `mutation_interval`.
    ///
    /// Must be called inside a tokio runtime. The first tick is skipped so
    /// the initial state is observable.
    pub fn spawn_mutator(self: &Arc<Self>) -> JoinHandle<()> {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(server.config.mutation_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                server.mutate_once();
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rolls latency and failure for one call.
    fn roll(&self, (min, max): (Duration, Duration), op: &str) -> RemoteResult<Duration> {
        let mut state = self.lock();
        if state.rng.gen_bool(self.config.failure_probability) {
            warn!("event=server_{op} module=remote status=error error_code=injected_failure");
            return Err(RemoteError::Unavailable(format!(
                "simulated {op} failure"
            )));
        }
        let min_ms = min.as_millis() as u64;
        let max_ms = max.as_millis() as u64;
        Ok(Duration::from_millis(state.rng.gen_range(min_ms..=max_ms)))
    }
}

#[async_trait]
impl QuoteRemote for SimulatedServer {
    async fn fetch_all(&self) -> RemoteResult<Value> {
        let delay = self.roll(self.config.fetch_latency, "fetch")?;
        tokio::time::sleep(delay).await;

        let quotes = self.snapshot();
        debug!(
            "event=server_fetch module=remote status=ok count={} latency_ms={}",
            quotes.len(),
            delay.as_millis()
        );
        Ok(quotes_to_value(&quotes))
    }

    async fn push(&self, quotes: &[Quote]) -> RemoteResult<Value> {
        let delay = self.roll(self.config.push_latency, "push")?;
        tokio::time::sleep(delay).await;

        let mut state = self.lock();
        let mut existing = state.quotes.iter().map(Quote::key).collect::<HashSet<_>>();
        let mut accepted = 0usize;
        for quote in quotes {
            let Ok(trimmed) = Quote::new(&quote.text, &quote.category) else {
                continue;
            };
            if existing.insert(trimmed.key()) {
                state.quotes.push(trimmed);
                accepted += 1;
            }
        }
        debug!(
            "event=server_push module=remote status=ok received={} accepted={} count={} latency_ms={}",
            quotes.len(),
            accepted,
            state.quotes.len(),
            delay.as_millis()
        );
        Ok(quotes_to_value(&state.quotes))
    }
}

#[cfg(test)]
mod tests {
    use super::{Mutation, QuoteRemote, RemoteError, SimulatedServer, SERVER_CATEGORY};
    use crate::config::ServerConfig;
    use crate::model::quote::{parse_quote_list, Quote};

    fn q(text: &str, category: &str) -> Quote {
        Quote::new(text, category).unwrap()
    }

    #[tokio::test]
    async fn fetch_returns_server_collection() {
        let server = SimulatedServer::with_quotes(vec![q("a", "b")], ServerConfig::instant(1));
        let payload = server.fetch_all().await.unwrap();
        assert_eq!(parse_quote_list(&payload), vec![q("a", "b")]);
    }

    #[tokio::test]
    async fn push_appends_only_absent_keys() {
        let server = SimulatedServer::with_quotes(vec![q("a", "b")], ServerConfig::instant(1));
        let payload = server
            .push(&[q("a", "b"), q("a", "c"), q("a", "c")])
            .await
            .unwrap();
        assert_eq!(parse_quote_list(&payload), vec![q("a", "b"), q("a", "c")]);
        assert_eq!(server.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_unavailable() {
        let config = ServerConfig {
            failure_probability: 1.0,
            ..ServerConfig::instant(1)
        };
        let server = SimulatedServer::new(config);
        assert!(matches!(
            server.fetch_all().await,
            Err(RemoteError::Unavailable(_))
        ));
        assert!(matches!(
            server.push(&[]).await,
            Err(RemoteError::Unavailable(_))
        ));
    }

    #[test]
    fn mutate_once_respects_probability() {
        let never = SimulatedServer::new(ServerConfig {
            mutation_probability: 0.0,
            ..ServerConfig::instant(3)
        });
        assert!(never.mutate_once().is_none());

        let always = SimulatedServer::new(ServerConfig {
            mutation_probability: 1.0,
            ..ServerConfig::instant(3)
        });
        let before = always.snapshot();
        let mutation = always.mutate_once().expect("mutation should happen");
        let after = always.snapshot();
        match mutation {
            Mutation::Inserted(quote) => {
                assert_eq!(after.len(), before.len() + 1);
                assert_eq!(quote.category, "Server");
            }
            Mutation::TextRewritten { before: old, after: new } => {
                assert_eq!(new.text, format!("{} (updated remotely)", old.text));
                assert!(after.contains(&new));
            }
            Mutation::CategoryRewritten { before: old, after: new } => {
                assert_eq!(new.text, old.text);
                assert_eq!(new.category, SERVER_CATEGORY);
                assert_ne!(old.category, SERVER_CATEGORY);
                assert!(after.contains(&new));
            }
        }
    }

    #[test]
    fn empty_server_always_inserts() {
        let server = SimulatedServer::with_quotes(
            Vec::new(),
            ServerConfig {
                mutation_probability: 1.0,
                ..ServerConfig::instant(9)
            },
        );
        assert!(matches!(server.mutate_once(), Some(Mutation::Inserted(_))));
    }

    #[test]
    fn category_rewrites_always_target_server_category() {
        let mut rewrites = 0;
        for seed in 0..64 {
            let server = SimulatedServer::new(ServerConfig {
                mutation_probability: 1.0,
                ..ServerConfig::instant(seed)
            });
            if let Some(Mutation::CategoryRewritten { before, after }) = server.mutate_once() {
                assert_eq!(after.category, SERVER_CATEGORY);
                assert_eq!(after.text, before.text);
                rewrites += 1;
            }
        }
        assert!(rewrites > 0, "64 seeds should hit at least one category rewrite");
    }

    #[test]
    fn quotes_already_in_server_category_are_never_category_rewritten() {
        for seed in 0..32 {
            let server = SimulatedServer::with_quotes(
                vec![q("held", SERVER_CATEGORY)],
                ServerConfig {
                    mutation_probability: 1.0,
                    ..ServerConfig::instant(seed)
                },
            );
            let mutation = server.mutate_once();
            assert!(
                !matches!(mutation, Some(Mutation::CategoryRewritten { .. })),
                "seed {seed}: {mutation:?}"
            );
        }
    }
}
