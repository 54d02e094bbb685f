use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Key/value pairs of an object or map node, in deterministic key order.
pub type Fields = BTreeMap<String, Value>;

/// A leaf value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::String(_) => "string",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
        }
    }

    /// Whether this scalar is the zero value of its type.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::String(s) => s.is_empty(),
            Scalar::Bool(b) => !b,
            Scalar::Int(i) => *i == 0,
            Scalar::Float(f) => *f == 0.0,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Int(_) => 1,
            Scalar::Float(_) => 2,
            Scalar::String(_) => 3,
        }
    }

    /// Total order used to canonicalise set contents.
    pub fn canonical_cmp(&self, other: &Scalar) -> Ordering {
        match (self, other) {
            (Scalar::String(a), Scalar::String(b)) => a.cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::Float(a), Scalar::Float(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{s}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A node of a configuration tree.
///
/// An absent field is represented by a missing key in the owning [`Fields`];
/// there is deliberately no null variant.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Leaf value.
    Scalar(Scalar),
    /// Ordered repeated values.
    List(Vec<Value>),
    /// Unordered repeated values. Equality ignores element order.
    Set(Vec<Value>),
    /// Free-form string-keyed values.
    Map(Fields),
    /// Schema-defined nested block.
    Object(Fields),
}

impl Value {
    /// Build a set in canonical order with duplicates removed.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut items: Vec<Value> = items.into_iter().collect();
        items.sort_by(Value::canonical_cmp);
        items.dedup();
        Value::Set(items)
    }

    /// Build an object node from key/value pairs.
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a map node from key/value pairs.
    pub fn map<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short kind label used in error messages and diff output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(s) => s.type_name(),
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Whether this value is the zero value of its kind.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Scalar(s) => s.is_zero(),
            Value::List(items) | Value::Set(items) => items.is_empty(),
            Value::Map(fields) | Value::Object(fields) => fields.is_empty(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(Scalar::Float(f)) => Some(*f),
            Value::Scalar(Scalar::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// Elements of a list or set.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map or object.
    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Value::Map(fields) | Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Walk a path of keys and list indices and return the value found there.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let mut current = self;
        for segment in path {
            current = match current {
                Value::Map(fields) | Value::Object(fields) => fields.get(*segment)?,
                Value::List(items) | Value::Set(items) => {
                    let idx: usize = segment.parse().ok()?;
                    items.get(idx)?
                }
                Value::Scalar(_) => return None,
            };
        }
        Some(current)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Scalar(_) => 0,
            Value::List(_) => 1,
            Value::Set(_) => 2,
            Value::Map(_) => 3,
            Value::Object(_) => 4,
        }
    }

    /// Total order over values, used to canonicalise sets.
    pub fn canonical_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a.canonical_cmp(b),
            (Value::List(a), Value::List(b)) => cmp_items(a.iter(), b.iter()),
            (Value::Set(a), Value::Set(b)) => cmp_items(
                sorted_refs(a).into_iter(),
                sorted_refs(b).into_iter(),
            ),
            (Value::Map(a), Value::Map(b)) | (Value::Object(a), Value::Object(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = ka.cmp(kb).then_with(|| va.canonical_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn sorted_refs(items: &[Value]) -> Vec<&Value> {
    let mut refs: Vec<&Value> = items.iter().collect();
    refs.sort_by(|a, b| a.canonical_cmp(b));
    refs
}

fn cmp_items<'a>(
    mut left: impl Iterator<Item = &'a Value>,
    mut right: impl Iterator<Item = &'a Value>,
) -> Ordering {
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) => {
                let ord = l.canonical_cmp(r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len()
                    && sorted_refs(a)
                        .into_iter()
                        .zip(sorted_refs(b))
                        .all(|(l, r)| l == r)
            }
            (Value::Map(a), Value::Map(b)) | (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(Scalar::String(s)) => write!(f, "{s:?}"),
            Value::Scalar(s) => write!(f, "{s}"),
            other => match serde_json::to_string(other) {
                Ok(json) => write!(f, "{json}"),
                Err(_) => write!(f, "<{}>", other.kind_name()),
            },
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(Scalar::String(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(Scalar::Float(value))
    }
}
