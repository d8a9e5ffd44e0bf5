//! Pure merge and conflict-detection algorithm.
//!
//! # Invariants
//! - Merged output never holds two quotes with the same key.
//! - Remote quotes come first and win key ties; local quotes with unseen
//!   keys are appended in their original order.
//! - Conflicts are advisory: detection never changes the merged output.

use crate::model::conflict::Conflict;
use crate::model::quote::Quote;
use std::collections::{HashMap, HashSet};

/// Quotes grouped by trimmed text, groups in first-seen order.
#[derive(Debug, Default)]
pub struct TextGroups<'a> {
    order: Vec<&'a str>,
    groups: HashMap<&'a str, Vec<&'a Quote>>,
}

impl<'a> TextGroups<'a> {
    pub fn build(quotes: &'a [Quote]) -> Self {
        let mut grouped = Self::default();
        for quote in quotes {
            let text = quote.text.trim();
            if !grouped.groups.contains_key(text) {
                grouped.order.push(text);
            }
            grouped.groups.entry(text).or_default().push(quote);
        }
        grouped
    }

    pub fn get(&self, text: &str) -> Option<&[&'a Quote]> {
        self.groups.get(text).map(Vec::as_slice)
    }

    /// Iterates `(text, group)` pairs in first-seen order.
    pub fn iter<'s>(&'s self) -> impl Iterator<Item = (&'a str, &'s [&'a Quote])> + 's {
        self.order
            .iter()
            .filter_map(move |text| self.get(text).map(|group| (*text, group)))
    }
}

/// Detects same-text, different-category divergences.
///
/// For each local text group with a remote counterpart, when any local
/// category is missing from the remote group, every local quote of that
/// group is paired with the first remote quote whose category differs from
/// it (or the first remote quote when none differs).
pub fn detect_conflicts(local: &[Quote], remote: &[Quote]) -> Vec<Conflict> {
    let local_groups = TextGroups::build(local);
    let remote_groups = TextGroups::build(remote);
    let mut conflicts = Vec::new();

    for (text, local_items) in local_groups.iter() {
        let Some(remote_items) = remote_groups.get(text) else {
            continue;
        };
        let Some(first_remote) = remote_items.first() else {
            continue;
        };

        let diverged = local_items
            .iter()
            .any(|l| !remote_items.iter().any(|r| r.category == l.category));
        if !diverged {
            continue;
        }

        for local_quote in local_items {
            let server = remote_items
                .iter()
                .find(|r| r.category != local_quote.category)
                .unwrap_or(first_remote);
            conflicts.push(Conflict::new((*local_quote).clone(), (*server).clone()));
        }
    }

    conflicts
}

/// Remote-first union of both collections, deduplicated by key.
pub fn merge_remote_first(local: &[Quote], remote: &[Quote]) -> Vec<Quote> {
    let mut seen = HashSet::new();
    remote
        .iter()
        .chain(local.iter())
        .filter_map(|quote| Quote::new(&quote.text, &quote.category).ok())
        .filter(|quote| seen.insert(quote.key()))
        .collect()
}
