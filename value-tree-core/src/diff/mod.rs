//! Core configuration tree diffing.

pub mod engine;
pub mod result;

pub use engine::{diff, diff_values, diff_with_options, join_path, DiffOptions};
pub use result::DiffEntry;
