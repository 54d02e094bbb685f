//! Configuration value trees: parsing, writing, and structural diffing.

pub mod diff;
pub mod format;
pub mod parser;
pub mod tree;
pub mod writer;

pub use diff::{diff, diff_values, diff_with_options, join_path, DiffEntry, DiffOptions};
pub use format::{format_json, format_summary, format_text};
pub use parser::{from_json, json_kind, parse, parse_file, ParseError};
pub use tree::{Fields, Scalar, Value};
pub use writer::{fields_to_json, to_json, write, write_file, WriteError};
