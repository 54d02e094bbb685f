use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::diff::join_path;
use crate::tree::{Fields, Scalar, Value};

/// Errors that can occur while parsing JSON into a configuration tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input could not be decoded as JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to read input file.
    #[error("failed to read JSON file: {0}")]
    Io(#[from] std::io::Error),
    /// Document parsed but does not have the shape of a configuration tree.
    #[error("malformed configuration tree: {0}")]
    Malformed(String),
}

/// Parse JSON bytes into the top-level fields of a configuration tree.
///
/// The document root must be a JSON object. `null` members are dropped, so
/// an explicit `null` reads the same as an absent key. A `null` array element
/// has no such reading and is rejected.
pub fn parse(json: &[u8]) -> Result<Fields, ParseError> {
    let raw: serde_json::Value = serde_json::from_slice(json)?;
    match raw {
        serde_json::Value::Object(members) => fields_from_json(&members, ""),
        other => Err(ParseError::Malformed(format!(
            "expected a JSON object at the root, found {}",
            json_kind(&other)
        ))),
    }
}

/// Parse a JSON file into the top-level fields of a configuration tree.
pub fn parse_file(path: &Path) -> Result<Fields, ParseError> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}

/// Convert a JSON value into a tree value. Returns `None` for `null`.
///
/// Arrays become lists and objects become object nodes; distinguishing sets
/// and maps requires a schema and is left to callers that have one.
pub fn from_json(value: &serde_json::Value) -> Result<Option<Value>, ParseError> {
    convert(value, "")
}

fn convert(value: &serde_json::Value, path: &str) -> Result<Option<Value>, ParseError> {
    Ok(Some(match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Bool(b) => Value::Scalar(Scalar::Bool(*b)),
        serde_json::Value::Number(n) => Value::Scalar(match n.as_i64() {
            Some(i) => Scalar::Int(i),
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        serde_json::Value::String(s) => Value::Scalar(Scalar::String(s.clone())),
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let item_path = join_path(path, &idx.to_string());
                match convert(item, &item_path)? {
                    Some(value) => out.push(value),
                    None => {
                        return Err(ParseError::Malformed(format!(
                            "null array element at {item_path}"
                        )))
                    }
                }
            }
            Value::List(out)
        }
        serde_json::Value::Object(members) => Value::Object(fields_from_json(members, path)?),
    }))
}

fn fields_from_json(
    members: &serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Result<Fields, ParseError> {
    let mut fields = Fields::new();
    for (key, value) in members {
        if let Some(value) = convert(value, &join_path(path, key))? {
            fields.insert(key.clone(), value);
        }
    }
    Ok(fields)
}

/// Short JSON kind label used in error messages.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, ParseError};
    use crate::tree::Value;

    #[test]
    fn null_members_read_as_absent() {
        let fields = parse(br#"{"name": "c1", "description": null}"#).expect("parse");
        assert_eq!(fields.get("name"), Some(&Value::from("c1")));
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn null_array_elements_are_rejected() {
        let err = parse(br#"{"zones": ["a", null]}"#).expect_err("null element");
        assert!(matches!(err, ParseError::Malformed(ref msg) if msg.contains("zones.1")));

        let err = parse(br#"{"blocks": [{"tags": [null]}]}"#).expect_err("nested null element");
        assert!(matches!(err, ParseError::Malformed(ref msg) if msg.contains("blocks.0.tags.0")));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let err = parse(b"[1, 2]").expect_err("array root should fail");
        assert!(matches!(err, ParseError::Malformed(_)));
    }
}
