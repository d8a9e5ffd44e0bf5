//! Core use-case services.
//!
//! # Responsibility
//! - Own the local quote collection and its persistence policy.
//! - Keep the command layer decoupled from storage details.

pub mod quote_book;
pub mod transfer;
