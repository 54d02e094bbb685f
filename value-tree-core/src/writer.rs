use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::tree::{Fields, Scalar, Value};

/// Errors that can occur while writing a configuration tree as JSON.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to serialize JSON bytes.
    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to write output file.
    #[error("failed to write JSON file: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize configuration tree fields into pretty-printed JSON bytes.
pub fn write(fields: &Fields) -> Result<Vec<u8>, WriteError> {
    let mut bytes = serde_json::to_vec_pretty(&fields_to_json(fields))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize configuration tree fields and write them to `path`.
pub fn write_file(fields: &Fields, path: &Path) -> Result<(), WriteError> {
    let bytes = write(fields)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Convert a tree value into plain JSON. Lists and sets both become arrays.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Scalar(Scalar::String(s)) => serde_json::Value::String(s.clone()),
        Value::Scalar(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
        Value::Scalar(Scalar::Int(i)) => serde_json::Value::from(*i),
        Value::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::List(items) | Value::Set(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect())
        }
        Value::Map(fields) | Value::Object(fields) => fields_to_json(fields),
    }
}

/// Convert configuration tree fields into a JSON object.
pub fn fields_to_json(fields: &Fields) -> serde_json::Value {
    serde_json::Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), to_json(value)))
            .collect(),
    )
}
