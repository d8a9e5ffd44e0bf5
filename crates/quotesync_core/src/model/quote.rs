//! Quote domain model.
//!
//! # Responsibility
//! - Define the canonical text/category record shared by storage, import,
//!   export and remote sync paths.
//! - Own the validity predicate applied to every untrusted JSON source.
//!
//! # Invariants
//! - `text` and `category` are trimmed and non-empty.
//! - Identity is the exact, case-sensitive `text||category` key.
//! - Deserialization validates and trims; invalid input is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Separator used when building identity keys.
pub const KEY_SEPARATOR: &str = "||";

/// Validation errors for quote construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteValidationError {
    /// `text` is missing or blank after trimming.
    EmptyText,
    /// `category` is missing or blank after trimming.
    EmptyCategory,
}

impl Display for QuoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "quote text cannot be empty"),
            Self::EmptyCategory => write!(f, "quote category cannot be empty"),
        }
    }
}

impl Error for QuoteValidationError {}

/// Identity key of a quote (`text||category`, post-trim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuoteKey(String);

impl QuoteKey {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for QuoteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical quote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuote")]
pub struct Quote {
    pub text: String,
    pub category: String,
}

/// Unvalidated wire shape used as the deserialization source.
#[derive(Deserialize)]
struct RawQuote {
    text: String,
    category: String,
}

impl TryFrom<RawQuote> for Quote {
    type Error = QuoteValidationError;

    fn try_from(value: RawQuote) -> Result<Self, Self::Error> {
        Quote::new(value.text, value.category)
    }
}

impl Quote {
    /// Creates a quote from user or external input.
    ///
    /// Both fields are trimmed before validation.
    ///
    /// # Errors
    /// - `EmptyText` when `text` is blank.
    /// - `EmptyCategory` when `category` is blank.
    pub fn new(
        text: impl AsRef<str>,
        category: impl AsRef<str>,
    ) -> Result<Self, QuoteValidationError> {
        let text = text.as_ref().trim();
        let category = category.as_ref().trim();
        if text.is_empty() {
            return Err(QuoteValidationError::EmptyText);
        }
        if category.is_empty() {
            return Err(QuoteValidationError::EmptyCategory);
        }
        Ok(Self {
            text: text.to_string(),
            category: category.to_string(),
        })
    }

    /// Returns the identity key for dedup and conflict bookkeeping.
    pub fn key(&self) -> QuoteKey {
        QuoteKey(format!(
            "{}{KEY_SEPARATOR}{}",
            self.text.trim(),
            self.category.trim()
        ))
    }

    /// Display line used by the command layer.
    pub fn display_line(&self) -> String {
        format!("\"{}\" - {}", self.text, self.category)
    }
}

/// Returns whether a JSON value is an acceptable quote.
///
/// Accepts only objects whose `text` and `category` are strings that are
/// non-empty after trimming. Extra fields are ignored.
pub fn is_valid_quote(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let non_blank = |field: &str| {
        object
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };
    non_blank("text") && non_blank("category")
}

/// Converts one JSON value into a trimmed quote when it passes validation.
pub fn quote_from_value(value: &Value) -> Option<Quote> {
    if !is_valid_quote(value) {
        return None;
    }
    let text = value.get("text").and_then(Value::as_str)?;
    let category = value.get("category").and_then(Value::as_str)?;
    Quote::new(text, category).ok()
}

/// Parses a JSON array of quotes, dropping invalid elements.
///
/// Non-array payloads yield an empty list.
pub fn parse_quote_list(value: &Value) -> Vec<Quote> {
    match value.as_array() {
        Some(items) => items.iter().filter_map(quote_from_value).collect(),
        None => Vec::new(),
    }
}

/// Serializes quotes into their JSON wire array.
pub fn quotes_to_value(quotes: &[Quote]) -> Value {
    Value::Array(
        quotes
            .iter()
            .map(|quote| serde_json::json!({ "text": quote.text, "category": quote.category }))
            .collect(),
    )
}

/// Built-in seed collection used on first start and on corrupt state.
pub fn default_quotes() -> Vec<Quote> {
    [
        (
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        ("Success is not in what you have, but who you are.", "Success"),
        ("Happiness depends upon ourselves.", "Happiness"),
    ]
    .into_iter()
    .map(|(text, category)| Quote {
        text: text.to_string(),
        category: category.to_string(),
    })
    .collect()
}
