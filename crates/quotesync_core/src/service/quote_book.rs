//! Owned local quote store.
//!
//! # Responsibility
//! - Hold the local quote collection that the command layer displays and the
//!   reconciler merges into.
//! - Persist the collection, category filter and last viewed quote through a
//!   `KvRepository` collaborator.
//!
//! # Invariants
//! - Loading never fails: malformed persisted data falls back to defaults.
//! - Every in-memory quote passed `Quote::new` validation.
//! - Persistence failures are logged and never propagated; in-memory state
//!   stays authoritative for the running session.

use crate::model::quote::{
    default_quotes, quote_from_value, Quote, QuoteKey, QuoteValidationError,
};
use crate::repo::kv_repo::{
    KvRepository, Namespace, LAST_FILTER_KEY, LAST_VIEWED_KEY, QUOTES_KEY,
};
use log::{error, info, warn};
use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;

/// Filter value that matches every category.
pub const ALL_CATEGORIES: &str = "all";

/// Local quote store owning its persistence collaborator.
pub struct QuoteBook<K: KvRepository> {
    repo: K,
    quotes: Vec<Quote>,
    filter: String,
}

impl<K: KvRepository> QuoteBook<K> {
    /// Loads persisted state or seeds defaults.
    ///
    /// # Side effects
    /// - Writes the default collection back when the stored one is missing
    ///   or invalid.
    pub fn load(repo: K) -> Self {
        let filter = match repo.get(Namespace::Durable, LAST_FILTER_KEY) {
            Ok(Some(value)) if !value.trim().is_empty() => value.trim().to_string(),
            Ok(_) => ALL_CATEGORIES.to_string(),
            Err(err) => {
                warn!("event=filter_load module=service status=error error={err}");
                ALL_CATEGORIES.to_string()
            }
        };

        let mut book = Self {
            repo,
            quotes: Vec::new(),
            filter,
        };

        match book.read_persisted_quotes() {
            Some(quotes) => {
                info!(
                    "event=quotes_load module=service status=ok source=storage count={}",
                    quotes.len()
                );
                book.quotes = quotes;
            }
            None => {
                book.quotes = default_quotes();
                book.persist();
                info!(
                    "event=quotes_load module=service status=ok source=defaults count={}",
                    book.quotes.len()
                );
            }
        }
        book
    }

    pub fn repo(&self) -> &K {
        &self.repo
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Validates, trims and appends one quote. Duplicates are allowed.
    pub fn add_quote(
        &mut self,
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> Result<Quote, QuoteValidationError> {
        let quote = Quote::new(text, category)?;
        self.quotes.push(quote.clone());
        self.persist();
        info!(
            "event=quote_add module=service status=ok count={}",
            self.quotes.len()
        );
        Ok(quote)
    }

    /// Appends quotes without validation; callers pass validated quotes only.
    pub(crate) fn extend(&mut self, quotes: impl IntoIterator<Item = Quote>) {
        self.quotes.extend(quotes);
        self.persist();
    }

    /// Replaces the whole collection and persists it.
    pub fn replace_all(&mut self, quotes: Vec<Quote>) {
        self.quotes = quotes;
        self.persist();
    }

    /// Removes every entry with `key`, returning the removed count.
    pub fn remove_by_key(&mut self, key: &QuoteKey) -> usize {
        let before = self.quotes.len();
        self.quotes.retain(|quote| &quote.key() != key);
        let removed = before - self.quotes.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn contains_key(&self, key: &QuoteKey) -> bool {
        self.quotes.iter().any(|quote| &quote.key() == key)
    }

    /// Appends `quote` unless its key is already present.
    pub fn push_if_absent(&mut self, quote: Quote) -> bool {
        if self.contains_key(&quote.key()) {
            return false;
        }
        self.quotes.push(quote);
        self.persist();
        true
    }

    /// Distinct trimmed categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.quotes
            .iter()
            .map(|quote| quote.category.trim())
            .filter(|category| seen.insert(*category))
            .map(str::to_string)
            .collect()
    }

    /// Active filter; a stored filter naming no current category reads as `all`.
    pub fn filter(&self) -> &str {
        if self.filter == ALL_CATEGORIES || self.categories().contains(&self.filter) {
            self.filter.as_str()
        } else {
            ALL_CATEGORIES
        }
    }

    /// Selects and persists a category filter.
    ///
    /// Returns `false` (and leaves the filter unchanged) when `category` is
    /// neither `all` nor a known category.
    pub fn set_filter(&mut self, category: &str) -> bool {
        let category = category.trim();
        if category != ALL_CATEGORIES && !self.categories().iter().any(|c| c == category) {
            return false;
        }
        self.filter = category.to_string();
        if let Err(err) = self
            .repo
            .put(Namespace::Durable, LAST_FILTER_KEY, category)
        {
            error!("event=filter_save module=service status=error error={err}");
        }
        true
    }

    /// Picks a random quote matching the active filter.
    ///
    /// Returns `None` when no quote matches. A picked quote is recorded as
    /// last viewed in the session namespace.
    pub fn random_quote<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Quote> {
        let filter = self.filter().to_string();
        let candidates = self
            .quotes
            .iter()
            .filter(|quote| filter == ALL_CATEGORIES || quote.category == filter)
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return None;
        }

        let picked = candidates[rng.gen_range(0..candidates.len())].clone();
        self.save_last_viewed(&picked);
        Some(picked)
    }

    /// Last quote shown in this session; invalid or missing values yield `None`.
    pub fn last_viewed(&self) -> Option<Quote> {
        let raw = match self.repo.get(Namespace::Session, LAST_VIEWED_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("event=last_viewed_load module=service status=error error={err}");
                return None;
            }
        };
        serde_json::from_str::<Value>(&raw)
            .ok()
            .as_ref()
            .and_then(quote_from_value)
    }

    fn save_last_viewed(&self, quote: &Quote) {
        let result = serde_json::to_string(quote)
            .map_err(|err| err.to_string())
            .and_then(|raw| {
                self.repo
                    .put(Namespace::Session, LAST_VIEWED_KEY, &raw)
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = result {
            warn!("event=last_viewed_save module=service status=error error={err}");
        }
    }

    fn read_persisted_quotes(&self) -> Option<Vec<Quote>> {
        let raw = match self.repo.get(Namespace::Durable, QUOTES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("event=quotes_load module=service status=error error={err}");
                return None;
            }
        };

        let parsed = match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(
                    "event=quotes_load module=service status=fallback reason=unparsable error={err}"
                );
                return None;
            }
        };

        let Some(items) = parsed.as_array() else {
            warn!("event=quotes_load module=service status=fallback reason=not_array");
            return None;
        };

        let quotes = items.iter().map(quote_from_value).collect::<Option<Vec<_>>>();
        if quotes.is_none() {
            warn!("event=quotes_load module=service status=fallback reason=invalid_quote");
        }
        quotes
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.quotes)
            .map_err(|err| err.to_string())
            .and_then(|raw| {
                self.repo
                    .put(Namespace::Durable, QUOTES_KEY, &raw)
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = result {
            error!(
                "event=quotes_save module=service status=error count={} error={err}",
                self.quotes.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{QuoteBook, ALL_CATEGORIES};
    use crate::model::quote::{default_quotes, Quote};
    use crate::repo::kv_repo::{
        KvRepository, MemoryKvRepository, Namespace, LAST_VIEWED_KEY, QUOTES_KEY,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn book_with(raw: Option<&str>) -> QuoteBook<MemoryKvRepository> {
        let repo = MemoryKvRepository::new();
        if let Some(raw) = raw {
            repo.put(Namespace::Durable, QUOTES_KEY, raw).unwrap();
        }
        QuoteBook::load(repo)
    }

    #[test]
    fn load_seeds_defaults_and_persists_them() {
        let book = book_with(None);
        assert_eq!(book.quotes(), default_quotes().as_slice());
        let stored = book.repo().get(Namespace::Durable, QUOTES_KEY).unwrap();
        assert!(stored.is_some());
    }

    #[test]
    fn load_falls_back_on_malformed_state() {
        for raw in [
            "not json",
            r#"{"text":"a","category":"b"}"#,
            r#"[{"text":"a","category":"b"},{"text":"","category":"c"}]"#,
        ] {
            let book = book_with(Some(raw));
            assert_eq!(book.quotes(), default_quotes().as_slice(), "input: {raw}");
        }
    }

    #[test]
    fn load_restores_valid_state() {
        let book = book_with(Some(r#"[{"text":"a","category":"b"}]"#));
        assert_eq!(book.quotes(), &[Quote::new("a", "b").unwrap()]);
    }

    #[test]
    fn add_quote_rejects_invalid_input_without_mutation() {
        let mut book = book_with(Some("[]"));
        assert!(book.add_quote(" ", "x").is_err());
        assert!(book.is_empty());

        let added = book.add_quote("  hi ", " there ").unwrap();
        assert_eq!(added, Quote::new("hi", "there").unwrap());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        let mut book = book_with(Some("[]"));
        book.add_quote("a", "Life").unwrap();
        book.add_quote("b", "Work").unwrap();
        book.add_quote("c", "Life").unwrap();
        assert_eq!(book.categories(), vec!["Life", "Work"]);
    }

    #[test]
    fn filter_rejects_unknown_and_falls_back_when_category_disappears() {
        let mut book = book_with(Some("[]"));
        book.add_quote("a", "Life").unwrap();
        assert!(!book.set_filter("Nope"));
        assert_eq!(book.filter(), ALL_CATEGORIES);

        assert!(book.set_filter("Life"));
        assert_eq!(book.filter(), "Life");

        book.replace_all(vec![Quote::new("b", "Work").unwrap()]);
        assert_eq!(book.filter(), ALL_CATEGORIES);
    }

    #[test]
    fn random_quote_respects_filter_and_records_last_viewed() {
        let mut book = book_with(Some("[]"));
        book.add_quote("a", "Life").unwrap();
        book.add_quote("b", "Work").unwrap();
        book.set_filter("Work");

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let picked = book.random_quote(&mut rng).unwrap();
            assert_eq!(picked.category, "Work");
        }
        assert_eq!(book.last_viewed(), Some(Quote::new("b", "Work").unwrap()));
    }

    #[test]
    fn random_quote_returns_none_for_empty_book() {
        let mut book = book_with(Some("[]"));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(book.random_quote(&mut rng).is_none());
        assert!(book.last_viewed().is_none());
    }

    #[test]
    fn last_viewed_ignores_invalid_session_value() {
        let book = book_with(None);
        book.repo()
            .put(Namespace::Session, LAST_VIEWED_KEY, r#"{"text":""}"#)
            .unwrap();
        assert!(book.last_viewed().is_none());
    }

    #[test]
    fn remove_by_key_drops_every_duplicate() {
        let mut book = book_with(Some("[]"));
        book.add_quote("a", "b").unwrap();
        book.add_quote("a", "b").unwrap();
        let key = Quote::new("a", "b").unwrap().key();
        assert_eq!(book.remove_by_key(&key), 2);
        assert!(!book.contains_key(&key));
        assert!(book.push_if_absent(Quote::new("a", "b").unwrap()));
        assert!(!book.push_if_absent(Quote::new("a", "b").unwrap()));
    }
}
