//! Type coercion of configuration values against field descriptors.

use value_tree_core::{join_path, Fields, Scalar, Value};

use crate::error::SchemaError;
use crate::schema::{FieldDescriptor, FieldKind, ResourceSchema, ScalarType};

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Coerce a value to the declared scalar type.
///
/// Accepted conversions: numeric strings to numbers, integral floats to
/// ints, ints to floats, `"true"`/`"false"` to bools and numbers to strings.
/// Anything else is a type mismatch.
pub fn coerce_scalar(ty: ScalarType, value: &Value, path: &str) -> Result<Scalar, SchemaError> {
    let Value::Scalar(scalar) = value else {
        return Err(SchemaError::mismatch(path, ty.as_str(), value.kind_name()));
    };
    let mismatch = || SchemaError::mismatch(path, ty.as_str(), describe(scalar));

    match (ty, scalar) {
        (ScalarType::String, Scalar::String(s)) => Ok(Scalar::String(s.clone())),
        (ScalarType::String, Scalar::Int(i)) => Ok(Scalar::String(i.to_string())),
        (ScalarType::String, Scalar::Float(f)) => Ok(Scalar::String(f.to_string())),
        (ScalarType::Bool, Scalar::Bool(b)) => Ok(Scalar::Bool(*b)),
        (ScalarType::Bool, Scalar::String(s)) => match s.as_str() {
            "true" => Ok(Scalar::Bool(true)),
            "false" => Ok(Scalar::Bool(false)),
            _ => Err(mismatch()),
        },
        (ScalarType::Int, Scalar::Int(i)) => Ok(Scalar::Int(*i)),
        (ScalarType::Int, Scalar::Float(f)) => float_to_int(*f).ok_or_else(mismatch),
        (ScalarType::Int, Scalar::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Scalar::Int)
            .map_err(|_| mismatch()),
        (ScalarType::Float, Scalar::Float(f)) if f.is_finite() => Ok(Scalar::Float(*f)),
        (ScalarType::Float, Scalar::Int(i)) => Ok(Scalar::Float(*i as f64)),
        (ScalarType::Float, Scalar::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Scalar::Float(f)),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn float_to_int(f: f64) -> Option<Scalar> {
    if f.is_finite() && f.fract() == 0.0 && f >= -I64_BOUND && f < I64_BOUND {
        Some(Scalar::Int(f as i64))
    } else {
        None
    }
}

fn describe(scalar: &Scalar) -> String {
    match scalar {
        Scalar::String(s) => format!("string {s:?}"),
        other => format!("{} {other}", other.type_name()),
    }
}

/// Render a coerced scalar the way the canonical document carries it.
pub fn scalar_to_wire(scalar: &Scalar, int_as_string: bool) -> serde_json::Value {
    match scalar {
        Scalar::String(s) => serde_json::Value::String(s.clone()),
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Int(i) if int_as_string => serde_json::Value::String(i.to_string()),
        Scalar::Int(i) => serde_json::Value::from(*i),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
    }
}

/// Rebuild a configuration tree with the shapes its schema declares: sets
/// become canonical sets, maps become map nodes, scalars are coerced and a
/// lone object written for a single block is wrapped in a one-element list.
///
/// Unknown keys and over-long repeated fields are rejected.
pub fn conform(schema: &ResourceSchema, config: &Fields) -> Result<Fields, SchemaError> {
    conform_fields(schema.fields(), config, "")
}

fn conform_fields(
    children: &[FieldDescriptor],
    fields: &Fields,
    prefix: &str,
) -> Result<Fields, SchemaError> {
    let mut out = Fields::new();
    for (key, value) in fields {
        let path = join_path(prefix, key);
        let Some(fd) = children.iter().find(|c| &c.name == key) else {
            return Err(SchemaError::UnknownField { path });
        };
        out.insert(key.clone(), conform_value(fd, value, &path)?);
    }
    Ok(out)
}

/// Conform one value against its descriptor.
pub fn conform_value(
    fd: &FieldDescriptor,
    value: &Value,
    path: &str,
) -> Result<Value, SchemaError> {
    match &fd.kind {
        FieldKind::Scalar(ty) => Ok(Value::Scalar(coerce_scalar(*ty, value, path)?)),
        FieldKind::List(elem) => {
            let items = repeated_items(fd, value, path)?;
            check_max_items(fd, items.len(), path)?;
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                out.push(conform_value(elem, item, &format!("{path}.{idx}"))?);
            }
            Ok(Value::List(out))
        }
        FieldKind::Set(elem) => {
            let items = repeated_items(fd, value, path)?;
            check_max_items(fd, items.len(), path)?;
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                out.push(conform_value(elem, item, &format!("{path}.{idx}"))?);
            }
            Ok(Value::set(out))
        }
        FieldKind::Map(elem) => {
            let entries = value
                .as_fields()
                .ok_or_else(|| SchemaError::mismatch(path, "map", value.kind_name()))?;
            let mut out = Fields::new();
            for (key, entry) in entries {
                out.insert(key.clone(), conform_value(elem, entry, &join_path(path, key))?);
            }
            Ok(Value::Map(out))
        }
        FieldKind::Object(children) => {
            let entries = value
                .as_fields()
                .ok_or_else(|| SchemaError::mismatch(path, "object", value.kind_name()))?;
            Ok(Value::Object(conform_fields(children, entries, path)?))
        }
    }
}

fn repeated_items(
    fd: &FieldDescriptor,
    value: &Value,
    path: &str,
) -> Result<Vec<Value>, SchemaError> {
    match value {
        Value::List(items) | Value::Set(items) => Ok(items.clone()),
        Value::Object(_) | Value::Map(_) if fd.single_block => Ok(vec![value.clone()]),
        other => Err(SchemaError::mismatch(path, fd.kind.label(), other.kind_name())),
    }
}

fn check_max_items(fd: &FieldDescriptor, found: usize, path: &str) -> Result<(), SchemaError> {
    match fd.max_items {
        Some(max) if found > max => Err(SchemaError::TooManyItems {
            path: path.to_string(),
            max,
            found,
        }),
        _ => Ok(()),
    }
}
