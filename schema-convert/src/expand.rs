//! Configuration tree to canonical document.

use serde_json::{Map, Value as Json};
use value_tree_core::{join_path, Fields, Value};

use crate::coerce::{conform, scalar_to_wire};
use crate::error::SchemaError;
use crate::schema::{AbsentPolicy, FieldDescriptor, FieldKind, ResourceSchema};

/// Expand a configuration tree into the canonical document for `schema`.
///
/// Absent fields are omitted unless their descriptor asks for an explicit
/// empty value. Present zero values are sent unless the descriptor sets
/// `omit_zero`. Sets are written in canonical order. Constraint groups are
/// checked once the document is built; any error leaves no partial result.
pub fn expand(schema: &ResourceSchema, config: &Fields) -> Result<Json, SchemaError> {
    let typed = conform(schema, config)?;
    let mut doc = Map::new();
    expand_fields(schema.fields(), &typed, "", &mut doc)?;
    schema.check_constraints(&typed)?;
    Ok(Json::Object(doc))
}

fn expand_fields(
    children: &[FieldDescriptor],
    fields: &Fields,
    prefix: &str,
    out: &mut Map<String, Json>,
) -> Result<(), SchemaError> {
    for fd in children {
        let path = join_path(prefix, &fd.name);
        let wire = match fields.get(&fd.name) {
            Some(value) => expand_value(fd, value, &path)?,
            None => absent_value(fd),
        };
        if let Some(wire) = wire {
            insert_wire(out, &fd.wire, wire, &path)?;
        }
    }
    Ok(())
}

fn absent_value(fd: &FieldDescriptor) -> Option<Json> {
    if fd.computed || fd.absent != AbsentPolicy::EmitEmpty {
        return None;
    }
    match &fd.kind {
        FieldKind::List(_) | FieldKind::Set(_) if !fd.single_block => Some(Json::Array(Vec::new())),
        FieldKind::Scalar(_) => None,
        _ => Some(Json::Object(Map::new())),
    }
}

fn expand_value(
    fd: &FieldDescriptor,
    value: &Value,
    path: &str,
) -> Result<Option<Json>, SchemaError> {
    match (&fd.kind, value) {
        (FieldKind::Scalar(_), Value::Scalar(scalar)) => {
            if fd.omit_zero && scalar.is_zero() {
                Ok(None)
            } else {
                Ok(Some(scalar_to_wire(scalar, fd.int_as_string)))
            }
        }
        (FieldKind::List(elem), Value::List(items)) if fd.single_block => match items.first() {
            Some(item) => expand_element(elem, item, &format!("{path}.0")).map(Some),
            None => Ok(Some(Json::Object(Map::new()))),
        },
        (FieldKind::List(elem), Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                out.push(expand_element(elem, item, &format!("{path}.{idx}"))?);
            }
            Ok(Some(Json::Array(out)))
        }
        (FieldKind::Set(elem), Value::Set(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                out.push(expand_element(elem, item, &format!("{path}.{idx}"))?);
            }
            canonical_order(&mut out);
            Ok(Some(Json::Array(out)))
        }
        (FieldKind::Map(elem), Value::Map(entries)) => {
            let mut out = Map::new();
            for (key, entry) in entries {
                out.insert(key.clone(), expand_element(elem, entry, &join_path(path, key))?);
            }
            Ok(Some(Json::Object(out)))
        }
        (FieldKind::Object(children), Value::Object(fields)) => {
            let mut out = Map::new();
            expand_fields(children, fields, path, &mut out)?;
            Ok(Some(Json::Object(out)))
        }
        (kind, other) => Err(SchemaError::mismatch(path, kind.label(), other.kind_name())),
    }
}

/// Elements are always written, even when zero, so positions survive.
fn expand_element(elem: &FieldDescriptor, value: &Value, path: &str) -> Result<Json, SchemaError> {
    match (&elem.kind, value) {
        (FieldKind::Scalar(_), Value::Scalar(scalar)) => {
            Ok(scalar_to_wire(scalar, elem.int_as_string))
        }
        _ => Ok(expand_value(elem, value, path)?.unwrap_or_else(|| Json::Object(Map::new()))),
    }
}

/// Sort set elements by their serialised form and drop duplicates.
fn canonical_order(items: &mut Vec<Json>) {
    let mut keyed: Vec<(String, Json)> = items
        .drain(..)
        .map(|item| (item.to_string(), item))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    items.extend(keyed.into_iter().map(|(_, item)| item));
}

/// Write `value` at a dotted wire location, creating intermediate objects and
/// merging into objects another field already created there.
pub(crate) fn insert_wire(
    out: &mut Map<String, Json>,
    wire: &[String],
    value: Json,
    path: &str,
) -> Result<(), SchemaError> {
    let conflict = || SchemaError::WireConflict {
        path: path.to_string(),
        wire: wire.join("."),
    };
    let Some((last, parents)) = wire.split_last() else {
        return Err(conflict());
    };

    let mut target = out;
    for segment in parents {
        let slot = target
            .entry(segment.clone())
            .or_insert_with(|| Json::Object(Map::new()));
        target = match slot {
            Json::Object(inner) => inner,
            _ => return Err(conflict()),
        };
    }

    if let Some(existing) = target.get_mut(last) {
        return match (existing, value) {
            (Json::Object(existing), Json::Object(incoming)) => {
                for (key, item) in incoming {
                    if existing.contains_key(&key) {
                        return Err(conflict());
                    }
                    existing.insert(key, item);
                }
                Ok(())
            }
            _ => Err(conflict()),
        };
    }
    target.insert(last.clone(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use value_tree_core::{Fields, Value};

    use super::expand;
    use crate::error::SchemaError;
    use crate::schema::{
        ConstraintGroup, ConstraintKind, FieldDescriptor, ResourceSchema, ScalarType,
    };

    fn config(pairs: Vec<(&str, Value)>) -> Fields {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn cluster_schema() -> ResourceSchema {
        ResourceSchema::new(
            "cluster",
            "container.googleapis.com/Cluster",
            vec![
                FieldDescriptor::string("name").required(),
                FieldDescriptor::int("initial_node_count"),
                FieldDescriptor::int("max_pods").int_as_string(),
                FieldDescriptor::bool("enable_legacy_abac").omit_zero().with_default(false),
                FieldDescriptor::set("node_locations", FieldDescriptor::element(ScalarType::String))
                    .wire("locations"),
                FieldDescriptor::block(
                    "private_cluster_config",
                    vec![
                        FieldDescriptor::bool("enable_private_nodes"),
                        FieldDescriptor::string("master_ipv4_cidr_block"),
                    ],
                ),
                FieldDescriptor::block(
                    "default_snat_status",
                    vec![FieldDescriptor::bool("disabled")],
                )
                .wire("networkConfig.defaultSnatStatus"),
                FieldDescriptor::block(
                    "network_config",
                    vec![FieldDescriptor::string("datapath_provider")],
                ),
                FieldDescriptor::block("addons_config", vec![FieldDescriptor::bool("enabled")])
                    .emit_empty(),
                FieldDescriptor::string("endpoint").computed(),
            ],
        )
    }

    #[test]
    fn absent_fields_are_omitted_and_emit_empty_is_honoured() {
        let doc = expand(&cluster_schema(), &config(vec![("name", Value::from("c1"))]))
            .expect("expand");
        assert_eq!(doc, json!({"name": "c1", "addonsConfig": {}}));
    }

    #[test]
    fn explicit_zero_is_sent_unless_omit_zero() {
        let doc = expand(
            &cluster_schema(),
            &config(vec![
                ("initial_node_count", Value::from(0)),
                ("enable_legacy_abac", Value::from(false)),
            ]),
        )
        .expect("expand");
        assert_eq!(doc["initialNodeCount"], json!(0));
        assert!(doc.get("enableLegacyAbac").is_none());
    }

    #[test]
    fn blocks_become_objects_and_relocated_fields_merge() {
        let doc = expand(
            &cluster_schema(),
            &config(vec![
                (
                    "private_cluster_config",
                    Value::List(vec![Value::object([
                        ("enable_private_nodes", Value::from(true)),
                        ("master_ipv4_cidr_block", Value::from("10.0.0.0/28")),
                    ])]),
                ),
                (
                    "default_snat_status",
                    Value::List(vec![Value::object([("disabled", Value::from(true))])]),
                ),
                (
                    "network_config",
                    Value::List(vec![Value::object([(
                        "datapath_provider",
                        Value::from("ADVANCED_DATAPATH"),
                    )])]),
                ),
                ("max_pods", Value::from(110)),
            ]),
        )
        .expect("expand");

        assert_eq!(
            doc["privateClusterConfig"],
            json!({"enablePrivateNodes": true, "masterIpv4CidrBlock": "10.0.0.0/28"})
        );
        assert_eq!(
            doc["networkConfig"],
            json!({
                "defaultSnatStatus": {"disabled": true},
                "datapathProvider": "ADVANCED_DATAPATH"
            })
        );
        assert_eq!(doc["maxPods"], json!("110"));
    }

    #[test]
    fn sets_are_written_in_canonical_order() {
        let doc = expand(
            &cluster_schema(),
            &config(vec![(
                "node_locations",
                Value::List(vec![Value::from("us-central1-c"), Value::from("us-central1-a")]),
            )]),
        )
        .expect("expand");
        assert_eq!(doc["locations"], json!(["us-central1-a", "us-central1-c"]));
    }

    #[test]
    fn type_mismatch_fails_with_path() {
        let err = expand(
            &cluster_schema(),
            &config(vec![(
                "private_cluster_config",
                Value::List(vec![Value::object([("enable_private_nodes", Value::from("maybe"))])]),
            )]),
        )
        .expect_err("mismatch");
        assert!(matches!(
            err,
            SchemaError::TypeMismatch { ref path, .. }
                if path == "private_cluster_config.0.enable_private_nodes"
        ));
    }

    #[test]
    fn constraint_groups_are_enforced() {
        let schema = cluster_schema().with_constraint(ConstraintGroup::new(
            ConstraintKind::ExactlyOne,
            &["initial_node_count", "max_pods"],
        ));
        assert!(expand(&schema, &config(vec![("max_pods", Value::from(8))])).is_ok());
        assert!(matches!(
            expand(&schema, &config(vec![])),
            Err(SchemaError::ConstraintViolation { .. })
        ));
    }
}
