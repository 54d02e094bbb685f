//! Canonical document to configuration tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value as Json};
use value_tree_core::{from_json, join_path, json_kind, Fields, Value};

use crate::coerce::{coerce_scalar, conform_value};
use crate::error::SchemaError;
use crate::schema::{AbsentPolicy, FieldDescriptor, FieldKind, ResourceSchema};

/// A canonical-document key with no matching field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownFieldWarning {
    /// Dotted wire path of the key, list positions as indices.
    pub path: String,
    /// JSON kind of the ignored value.
    pub kind: String,
}

impl fmt::Display for UnknownFieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field {} ({}) ignored", self.path, self.kind)
    }
}

/// Result of [`flatten`]: the configuration tree plus schema-drift warnings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Flattened {
    pub config: Fields,
    pub warnings: Vec<UnknownFieldWarning>,
}

/// Flatten a canonical document into a configuration tree for `schema`.
///
/// `null` reads as absent. Absent fields receive their descriptor default,
/// blocks marked `synthesize_when_absent` are rebuilt from their children's
/// defaults, and keys the schema does not know are reported as warnings.
pub fn flatten(schema: &ResourceSchema, doc: &Json) -> Result<Flattened, SchemaError> {
    let empty = Map::new();
    let root = match doc {
        Json::Object(members) => members,
        Json::Null => &empty,
        other => return Err(SchemaError::mismatch("<root>", "object", json_kind(other))),
    };

    let mut warnings = Vec::new();
    let config = flatten_object(schema.fields(), root, None, "", "", &mut warnings)?;
    for warning in &warnings {
        tracing::debug!(schema = %schema.name, path = %warning.path, "unknown canonical field");
    }
    Ok(Flattened { config, warnings })
}

/// Wire keys claimed by descriptors. A node claimed by one field can still
/// hold keys relocated there by sibling fields.
#[derive(Debug, Default)]
struct Claims {
    owned: bool,
    children: BTreeMap<String, Claims>,
}

impl Claims {
    fn claim(&mut self, wire: &[String]) {
        let mut node = self;
        for segment in wire {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.owned = true;
    }

    fn adopt(&mut self, other: &Claims) {
        for (key, theirs) in &other.children {
            let ours = self.children.entry(key.clone()).or_default();
            ours.owned |= theirs.owned;
            ours.adopt(theirs);
        }
    }

    fn at(&self, wire: &[String]) -> Option<&Claims> {
        let mut node = self;
        for segment in wire {
            node = node.children.get(segment)?;
        }
        Some(node)
    }
}

fn flatten_object(
    children: &[FieldDescriptor],
    members: &Map<String, Json>,
    inherited: Option<&Claims>,
    wire_prefix: &str,
    prefix: &str,
    warnings: &mut Vec<UnknownFieldWarning>,
) -> Result<Fields, SchemaError> {
    let mut claims = Claims::default();
    for fd in children {
        claims.claim(&fd.wire);
    }
    if let Some(inherited) = inherited {
        claims.adopt(inherited);
    }
    report_unknown(members, &claims, wire_prefix, warnings);

    let mut out = Fields::new();
    for fd in children {
        let path = join_path(prefix, &fd.name);
        let wire_path = join_path(wire_prefix, &fd.wire_display());
        let nested = claims.at(&fd.wire);

        let value = match locate(members, &fd.wire) {
            Some(json) if fd.absent == AbsentPolicy::EmitEmpty && is_empty(json) => None,
            Some(json) if only_relocated(json, nested) => None,
            Some(json) => flatten_value(fd, json, nested, &wire_path, &path, warnings)?,
            None => None,
        };
        let value = match value {
            Some(value) => Some(value),
            None => absent_value(fd, &path)?,
        };
        if let Some(value) = value {
            out.insert(fd.name.clone(), value);
        }
    }
    Ok(out)
}

fn report_unknown(
    members: &Map<String, Json>,
    claims: &Claims,
    prefix: &str,
    warnings: &mut Vec<UnknownFieldWarning>,
) {
    for (key, value) in members {
        if value.is_null() {
            continue;
        }
        let path = join_path(prefix, key);
        match claims.children.get(key) {
            None => warnings.push(UnknownFieldWarning {
                path,
                kind: json_kind(value).to_string(),
            }),
            Some(node) if !node.owned => {
                if let Json::Object(inner) = value {
                    report_unknown(inner, node, &path, warnings);
                }
            }
            Some(_) => {}
        }
    }
}

fn locate<'a>(members: &'a Map<String, Json>, wire: &[String]) -> Option<&'a Json> {
    let (first, rest) = wire.split_first()?;
    let mut current = members.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Whether an object holds nothing but keys that sibling fields relocated
/// into it. Such an object was created by the siblings, not by its own field.
fn only_relocated(json: &Json, nested: Option<&Claims>) -> bool {
    let (Json::Object(members), Some(node)) = (json, nested) else {
        return false;
    };
    !node.children.is_empty()
        && members.values().any(|value| !value.is_null())
        && !has_unclaimed(members, node)
}

fn has_unclaimed(members: &Map<String, Json>, node: &Claims) -> bool {
    members.iter().filter(|(_, value)| !value.is_null()).any(|(key, value)| {
        match (node.children.get(key), value) {
            (None, _) => true,
            (Some(child), _) if child.owned => false,
            (Some(child), Json::Object(inner)) => has_unclaimed(inner, child),
            (Some(_), _) => true,
        }
    })
}

fn is_empty(json: &Json) -> bool {
    match json {
        Json::Object(members) => members.values().all(Json::is_null),
        Json::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn absent_value(fd: &FieldDescriptor, path: &str) -> Result<Option<Value>, SchemaError> {
    if fd.synthesize_when_absent {
        if let Some(children) = fd.object_children() {
            let mut discarded = Vec::new();
            let block = flatten_object(children, &Map::new(), None, "", path, &mut discarded)?;
            let block = Value::Object(block);
            return Ok(Some(if fd.single_block {
                Value::List(vec![block])
            } else {
                block
            }));
        }
    }
    match &fd.default {
        Some(default) => conform_value(fd, default, path).map(Some),
        None => Ok(None),
    }
}

fn flatten_value(
    fd: &FieldDescriptor,
    json: &Json,
    nested: Option<&Claims>,
    wire_path: &str,
    path: &str,
    warnings: &mut Vec<UnknownFieldWarning>,
) -> Result<Option<Value>, SchemaError> {
    let mismatch = || SchemaError::mismatch(path, fd.kind.label(), json_kind(json));

    match (&fd.kind, json) {
        (FieldKind::Scalar(ty), _) => match from_json(json) {
            Ok(Some(raw)) => Ok(Some(Value::Scalar(coerce_scalar(*ty, &raw, path)?))),
            Ok(None) => Ok(None),
            Err(_) => Err(mismatch()),
        },
        (FieldKind::List(elem), Json::Object(_)) if fd.single_block => {
            let item_path = format!("{path}.0");
            let item = flatten_value(elem, json, nested, wire_path, &item_path, warnings)?;
            Ok(Some(Value::List(item.into_iter().collect())))
        }
        (FieldKind::List(elem), Json::Array(items)) => {
            if fd.single_block && items.len() > 1 {
                return Err(SchemaError::TooManyItems {
                    path: path.to_string(),
                    max: 1,
                    found: items.len(),
                });
            }
            let out = flatten_items(elem, items, wire_path, path, warnings)?;
            Ok(Some(Value::List(out)))
        }
        (FieldKind::Set(elem), Json::Array(items)) => {
            let out = flatten_items(elem, items, wire_path, path, warnings)?;
            Ok(Some(Value::set(out)))
        }
        (FieldKind::Map(elem), Json::Object(entries)) => {
            let mut out = Fields::new();
            for (key, entry) in entries {
                let entry_wire = join_path(wire_path, key);
                let entry_path = join_path(path, key);
                let value = flatten_value(elem, entry, None, &entry_wire, &entry_path, warnings)?;
                if let Some(value) = value {
                    out.insert(key.clone(), value);
                }
            }
            Ok(Some(Value::Map(out)))
        }
        (FieldKind::Object(children), Json::Object(members)) => {
            let fields = flatten_object(children, members, nested, wire_path, path, warnings)?;
            Ok(Some(Value::Object(fields)))
        }
        _ => Err(mismatch()),
    }
}

fn flatten_items(
    elem: &FieldDescriptor,
    items: &[Json],
    wire_path: &str,
    path: &str,
    warnings: &mut Vec<UnknownFieldWarning>,
) -> Result<Vec<Value>, SchemaError> {
    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let item_wire = format!("{wire_path}.{idx}");
        let item_path = format!("{path}.{idx}");
        if let Some(value) = flatten_value(elem, item, None, &item_wire, &item_path, warnings)? {
            out.push(value);
        }
    }
    Ok(out)
}
