//! JSON export/import of the local quote collection.
//!
//! # Responsibility
//! - Render the collection as a pretty-printed JSON array.
//! - Merge imported arrays into a `QuoteBook`, filtered for validity and
//!   deduplicated by identity key.
//!
//! # Invariants
//! - Import never mutates the book unless at least one new quote is added.
//! - Every `ImportError` renders a user-facing message.

use crate::model::quote::{quote_from_value, Quote};
use crate::repo::kv_repo::KvRepository;
use crate::service::quote_book::QuoteBook;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Import/export failure.
#[derive(Debug)]
pub enum ImportError {
    /// File could not be read or written.
    Io(std::io::Error),
    /// Input is not JSON.
    Malformed(serde_json::Error),
    /// JSON root is not an array.
    NotArray,
    /// Array holds no valid quote.
    NoValidQuotes,
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "Failed to read file: {err}"),
            Self::Malformed(_) | Self::NotArray => write!(
                f,
                "Failed to import JSON. Make sure it's a valid array of {{text, category}} objects."
            ),
            Self::NoValidQuotes => write!(f, "No valid quotes found in the file."),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Malformed(err) => Some(err),
            Self::NotArray | Self::NoValidQuotes => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Counters reported after a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Quotes appended to the book.
    pub added: usize,
    /// Valid quotes skipped because their key already existed.
    pub duplicates: usize,
    /// Array elements rejected by the validity predicate.
    pub invalid: usize,
}

impl ImportSummary {
    pub fn message(&self) -> String {
        if self.added == 0 {
            "Import complete - no new quotes to add (duplicates ignored).".to_string()
        } else {
            format!("Imported {} new quote(s).", self.added)
        }
    }
}

/// Serializes quotes as a 2-space indented JSON array.
pub fn export_json(quotes: &[Quote]) -> String {
    // Vec<Quote> serialization cannot fail: every field is a string.
    serde_json::to_string_pretty(quotes).unwrap_or_else(|_| "[]".to_string())
}

/// File name for an export taken at `now`: `quotes-YYYY-MM-DD-HH-MM-SS.json`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("quotes-{}.json", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Writes the book's quotes into `dir`, returning the created file path.
pub fn export_to_dir<K: KvRepository>(
    book: &QuoteBook<K>,
    dir: impl AsRef<Path>,
    now: DateTime<Utc>,
) -> Result<PathBuf, ImportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(now));
    std::fs::write(&path, export_json(book.quotes()))?;
    info!(
        "event=quotes_export module=transfer status=ok count={}",
        book.len()
    );
    Ok(path)
}

/// Merges a raw JSON array into the book.
///
/// # Errors
/// - `Malformed` when `raw` is not JSON.
/// - `NotArray` when the root is not an array.
/// - `NoValidQuotes` when no element passes validation.
pub fn import_json<K: KvRepository>(
    book: &mut QuoteBook<K>,
    raw: &str,
) -> Result<ImportSummary, ImportError> {
    let parsed = serde_json::from_str::<Value>(raw).map_err(|err| {
        warn!("event=quotes_import module=transfer status=error reason=malformed");
        ImportError::Malformed(err)
    })?;
    let Some(items) = parsed.as_array() else {
        warn!("event=quotes_import module=transfer status=error reason=not_array");
        return Err(ImportError::NotArray);
    };

    let valid = items.iter().filter_map(quote_from_value).collect::<Vec<_>>();
    let invalid = items.len() - valid.len();
    if valid.is_empty() {
        warn!("event=quotes_import module=transfer status=error reason=no_valid_quotes");
        return Err(ImportError::NoValidQuotes);
    }

    let mut seen = book
        .quotes()
        .iter()
        .map(Quote::key)
        .collect::<HashSet<_>>();
    let total_valid = valid.len();
    let fresh = valid
        .into_iter()
        .filter(|quote| seen.insert(quote.key()))
        .collect::<Vec<_>>();

    let summary = ImportSummary {
        added: fresh.len(),
        duplicates: total_valid - fresh.len(),
        invalid,
    };
    if !fresh.is_empty() {
        book.extend(fresh);
    }
    info!(
        "event=quotes_import module=transfer status=ok added={} duplicates={} invalid={}",
        summary.added, summary.duplicates, summary.invalid
    );
    Ok(summary)
}

/// Reads `path` and merges it via `import_json`.
pub fn import_file<K: KvRepository>(
    book: &mut QuoteBook<K>,
    path: impl AsRef<Path>,
) -> Result<ImportSummary, ImportError> {
    let raw = std::fs::read_to_string(path)?;
    import_json(book, &raw)
}
