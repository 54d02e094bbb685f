use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use value_tree_core::{Scalar, Value};

use crate::equivalence::PredicateError;
use crate::schema::descriptor::{FieldDescriptor, ScalarType};
use crate::schema::resource::{ConstraintGroup, ConstraintKind, ResourceSchema};

/// Errors returned when loading schema definition files.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse schema file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid schema file {path}: {field}: {message}")]
    Invalid {
        path: String,
        field: String,
        message: String,
    },
    #[error("invalid schema file {path}: {field}: {source}")]
    Predicate {
        path: String,
        field: String,
        source: PredicateError,
    },
    #[error("schema {name} from {path} is already registered")]
    Duplicate { path: String, name: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    name: String,
    asset_type: String,
    #[serde(default, rename = "field")]
    fields: Vec<FieldDef>,
    #[serde(default, rename = "constraint")]
    constraints: Vec<ConstraintDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    elem: Option<String>,
    #[serde(default, rename = "field")]
    fields: Vec<FieldDef>,
    wire: Option<String>,
    #[serde(default)]
    computed: bool,
    #[serde(default)]
    required: bool,
    default: Option<toml::Value>,
    equivalence: Option<String>,
    max_items: Option<usize>,
    #[serde(default)]
    single_block: bool,
    #[serde(default)]
    emit_empty: bool,
    #[serde(default)]
    omit_zero: bool,
    #[serde(default)]
    synthesize_when_absent: bool,
    #[serde(default)]
    int_as_string: bool,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstraintDef {
    kind: String,
    fields: Vec<String>,
}

/// Load one resource schema from a TOML definition file.
pub fn load_definition(path: &Path) -> Result<ResourceSchema, SchemaLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_definition(&raw, &path.display().to_string())
}

/// Parse a TOML schema definition. `origin` names the source in errors.
pub fn parse_definition(raw: &str, origin: &str) -> Result<ResourceSchema, SchemaLoadError> {
    let parsed: SchemaFile = toml::from_str(raw).map_err(|source| SchemaLoadError::Parse {
        path: origin.to_string(),
        source,
    })?;

    let invalid = |field: &str, message: String| SchemaLoadError::Invalid {
        path: origin.to_string(),
        field: field.to_string(),
        message,
    };

    let mut fields = Vec::with_capacity(parsed.fields.len());
    for def in &parsed.fields {
        fields.push(build_field(def, "").map_err(|(field, message)| invalid(&field, message))?);
    }

    let mut schema = ResourceSchema::new(&parsed.name, &parsed.asset_type, fields);
    for constraint in &parsed.constraints {
        let kind = ConstraintKind::parse(&constraint.kind).ok_or_else(|| {
            invalid(
                &constraint.fields.join(","),
                format!("unknown constraint kind {:?}", constraint.kind),
            )
        })?;
        schema.constraint_groups.push(ConstraintGroup {
            fields: constraint.fields.clone(),
            kind,
        });
    }

    if let Some(problem) = schema.validate().into_iter().next() {
        return Err(invalid(&problem.path, problem.message));
    }
    Ok(schema)
}

type BuildError = (String, String);

fn build_field(def: &FieldDef, parent: &str) -> Result<FieldDescriptor, BuildError> {
    let path = if parent.is_empty() {
        def.name.clone()
    } else {
        format!("{parent}.{}", def.name)
    };
    let fail = |message: String| (path.clone(), message);

    let mut fd = match def.ty.as_str() {
        "list" | "set" | "map" | "block" => {
            let element = build_element(def, &path)?;
            match def.ty.as_str() {
                "list" => FieldDescriptor::list(&def.name, element),
                "set" => FieldDescriptor::set(&def.name, element),
                "map" => FieldDescriptor::map(&def.name, element),
                _ => {
                    let mut fd = FieldDescriptor::list(&def.name, element);
                    fd.single_block = true;
                    fd.max_items = Some(1);
                    fd
                }
            }
        }
        "object" => {
            if def.elem.is_some() {
                return Err(fail("object fields take nested fields, not elem".to_string()));
            }
            FieldDescriptor::object(&def.name, build_children(&def.fields, &path)?)
        }
        other => {
            let ty = ScalarType::parse(other)
                .ok_or_else(|| fail(format!("unknown field type {other:?}")))?;
            if !def.fields.is_empty() || def.elem.is_some() {
                return Err(fail("scalar fields cannot have nested fields or elem".to_string()));
            }
            FieldDescriptor::scalar(&def.name, ty)
        }
    };

    if let Some(wire) = &def.wire {
        fd = fd.wire(wire);
    }
    if let Some(default) = &def.default {
        let scalar = toml_scalar(default)
            .ok_or_else(|| fail("default must be a scalar".to_string()))?;
        fd = fd.with_default(scalar);
    }
    fd.computed = def.computed;
    fd.required = def.required;
    fd.equivalence = def.equivalence.clone();
    if def.max_items.is_some() {
        fd.max_items = def.max_items;
    }
    fd.single_block |= def.single_block;
    fd.synthesize_when_absent = def.synthesize_when_absent;
    fd.int_as_string = def.int_as_string;
    fd.description = def.description.clone();
    if def.emit_empty {
        fd = fd.emit_empty();
    }
    if def.omit_zero {
        fd = fd.omit_zero();
    }
    if fd.single_block && fd.max_items.is_none() {
        fd.max_items = Some(1);
    }
    Ok(fd)
}

fn build_element(def: &FieldDef, path: &str) -> Result<FieldDescriptor, BuildError> {
    match (&def.elem, def.fields.is_empty()) {
        (Some(elem), true) if elem != "object" => {
            let ty = ScalarType::parse(elem)
                .ok_or_else(|| (path.to_string(), format!("unknown element type {elem:?}")))?;
            Ok(FieldDescriptor::element(ty))
        }
        (None, false) => Ok(FieldDescriptor::element_object(build_children(&def.fields, path)?)),
        (Some(elem), false) if elem == "object" => {
            Ok(FieldDescriptor::element_object(build_children(&def.fields, path)?))
        }
        (None, true) | (Some(_), true) => Err((
            path.to_string(),
            "repeated fields need a scalar elem or nested fields".to_string(),
        )),
        (Some(_), false) => Err((
            path.to_string(),
            "nested fields and a scalar elem are mutually exclusive".to_string(),
        )),
    }
}

fn build_children(defs: &[FieldDef], parent: &str) -> Result<Vec<FieldDescriptor>, BuildError> {
    defs.iter().map(|def| build_field(def, parent)).collect()
}

fn toml_scalar(value: &toml::Value) -> Option<Value> {
    let scalar = match value {
        toml::Value::String(s) => Scalar::String(s.clone()),
        toml::Value::Integer(i) => Scalar::Int(*i),
        toml::Value::Float(f) => Scalar::Float(*f),
        toml::Value::Boolean(b) => Scalar::Bool(*b),
        _ => return None,
    };
    Some(Value::Scalar(scalar))
}

#[cfg(test)]
mod tests {
    use value_tree_core::Value;

    use super::{load_definition, parse_definition, SchemaLoadError};
    use crate::schema::{AbsentPolicy, ConstraintKind, FieldKind, ScalarType};

    const DEFINITION: &str = r#"
name = "example_widget"
asset_type = "widgets.example.com/Widget"

[[field]]
name = "name"
type = "string"
required = true

[[field]]
name = "zones"
type = "set"
elem = "string"
wire = "locations"

[[field]]
name = "size_gb"
type = "int"
int_as_string = true

[[field]]
name = "policy"
type = "block"
synthesize_when_absent = true

  [[field.field]]
  name = "enabled"
  type = "bool"
  default = false

  [[field.field]]
  name = "start_time"
  type = "string"
  equivalence = "rfc3339_time"

[[field]]
name = "addons"
type = "list"
single_block = true
emit_empty = true

  [[field.field]]
  name = "dashboard"
  type = "bool"
  omit_zero = true

[[constraint]]
kind = "mutually_exclusive"
fields = ["zones", "size_gb"]
"#;

    #[test]
    fn definition_builds_descriptor_tree() {
        let schema = parse_definition(DEFINITION, "inline").expect("definition parses");

        assert_eq!(schema.name, "example_widget");
        assert_eq!(schema.asset_type, "widgets.example.com/Widget");
        assert_eq!(schema.fields().len(), 5);

        let zones = schema.field("zones").expect("zones");
        assert_eq!(zones.wire, vec!["locations".to_string()]);
        assert!(matches!(
            &zones.kind,
            FieldKind::Set(elem) if elem.kind == FieldKind::Scalar(ScalarType::String)
        ));

        let start = schema
            .descriptor_at("policy.0.start_time")
            .expect("nested field");
        assert_eq!(start.path, "policy.*.start_time");
        assert_eq!(start.equivalence.as_deref(), Some("rfc3339_time"));

        let policy = schema.field("policy").expect("policy");
        assert!(policy.single_block && policy.synthesize_when_absent);
        assert_eq!(policy.max_items, Some(1));

        let addons = schema.field("addons").expect("addons");
        assert_eq!(addons.absent, AbsentPolicy::EmitEmpty);
        let dashboard = schema.descriptor_at("addons.0.dashboard").expect("dashboard");
        assert_eq!(dashboard.default, Some(Value::from(false)));

        assert_eq!(schema.constraint_groups.len(), 1);
        assert_eq!(schema.constraint_groups[0].kind, ConstraintKind::MutuallyExclusive);
    }

    #[test]
    fn invalid_definitions_name_the_field() {
        let raw = r#"
name = "broken"
asset_type = "x/Y"

[[field]]
name = "tags"
type = "list"
"#;
        let err = parse_definition(raw, "broken.toml").expect_err("no element");
        assert_eq!(
            err.to_string(),
            "invalid schema file broken.toml: tags: repeated fields need a scalar elem or nested fields"
        );

        let raw = r#"
name = "broken"
asset_type = "x/Y"

[[field]]
name = "count"
type = "int"
default = "many"
"#;
        let err = parse_definition(raw, "broken.toml").expect_err("bad default");
        assert!(matches!(err, SchemaLoadError::Invalid { ref field, .. } if field == "count"));
    }

    #[test]
    fn unknown_attributes_are_parse_errors() {
        let raw = r#"
name = "broken"
asset_type = "x/Y"

[[field]]
name = "count"
type = "int"
flavour = "vanilla"
"#;
        assert!(matches!(
            parse_definition(raw, "broken.toml"),
            Err(SchemaLoadError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_definition(&dir.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, SchemaLoadError::Io { .. }));
    }
}
