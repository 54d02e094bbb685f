//! Diff output formatters.

pub mod text;

pub use text::{format_summary, format_text};

use crate::diff::result::DiffEntry;

/// Diff entries as a pretty JSON array of `{"type": ..., "path": ...}` rows.
pub fn format_json(entries: &[DiffEntry]) -> String {
    serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string())
}
