use thiserror::Error;

use crate::schema::ConstraintKind;

/// Fatal conversion errors. Every variant names the offending field path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A value does not have, and cannot be coerced to, the declared type.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
    /// A configuration key has no field descriptor.
    #[error("{path}: no such field in schema")]
    UnknownField { path: String },
    /// A repeated field holds more elements than its descriptor allows.
    #[error("{path}: {found} items exceed the maximum of {max}")]
    TooManyItems {
        path: String,
        max: usize,
        found: usize,
    },
    /// A cross-field constraint group is not satisfied.
    #[error("constraint violation: {kind} [{}] (set: [{}])", fields.join(", "), present.join(", "))]
    ConstraintViolation {
        kind: ConstraintKind,
        fields: Vec<String>,
        present: Vec<String>,
    },
    /// Two descriptors write to the same canonical-document location.
    #[error("{path}: wire path {wire} collides with an existing value")]
    WireConflict { path: String, wire: String },
    /// A value has the right type but cannot be represented.
    #[error("{path}: {message}")]
    InvalidValue { path: String, message: String },
    /// No schema is registered under the requested name or asset type.
    #[error("unknown resource schema: {0}")]
    UnknownSchema(String),
}

impl SchemaError {
    pub(crate) fn mismatch(
        path: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        SchemaError::TypeMismatch {
            path: path.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}
