use serde::Serialize;

use crate::Value;

/// A single diff outcome for a field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DiffEntry {
    /// Field exists in both with identical content.
    Identical { path: String },
    /// Scalar field exists in both but the values differ.
    Modified {
        path: String,
        left: String,
        right: String,
    },
    /// Field or element only in the left input.
    OnlyLeft { path: String, value: Value },
    /// Field or element only in the right input.
    OnlyRight { path: String, value: Value },
    /// Structural mismatch (for example, list on one side and object on the other).
    Structural { path: String, description: String },
}

impl DiffEntry {
    /// Dotted/indexed path the entry refers to.
    pub fn path(&self) -> &str {
        match self {
            DiffEntry::Identical { path }
            | DiffEntry::Modified { path, .. }
            | DiffEntry::OnlyLeft { path, .. }
            | DiffEntry::OnlyRight { path, .. }
            | DiffEntry::Structural { path, .. } => path,
        }
    }

    /// Whether the entry reports an actual difference.
    pub fn is_change(&self) -> bool {
        !matches!(self, DiffEntry::Identical { .. })
    }
}
