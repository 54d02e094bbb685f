use std::collections::BTreeSet;
use std::fmt;

use value_tree_core::Fields;

use crate::coerce::coerce_scalar;
use crate::error::SchemaError;
use crate::schema::descriptor::{AbsentPolicy, FieldDescriptor, FieldKind};

/// Kind of cross-field constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    AtLeastOne,
    ExactlyOne,
    MutuallyExclusive,
}

impl ConstraintKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "at_least_one" => Some(ConstraintKind::AtLeastOne),
            "exactly_one" => Some(ConstraintKind::ExactlyOne),
            "mutually_exclusive" => Some(ConstraintKind::MutuallyExclusive),
            _ => None,
        }
    }

    fn allows(self, present: usize) -> bool {
        match self {
            ConstraintKind::AtLeastOne => present >= 1,
            ConstraintKind::ExactlyOne => present == 1,
            ConstraintKind::MutuallyExclusive => present <= 1,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConstraintKind::AtLeastOne => "at least one of",
            ConstraintKind::ExactlyOne => "exactly one of",
            ConstraintKind::MutuallyExclusive => "at most one of",
        };
        f.write_str(label)
    }
}

/// A cross-field rule over configuration paths (`a`, `block.0.b`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintGroup {
    pub fields: Vec<String>,
    pub kind: ConstraintKind,
}

impl ConstraintGroup {
    pub fn new(kind: ConstraintKind, fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            kind,
        }
    }

    /// Check the group against a configuration. A field counts as set when its
    /// key is present, whatever the value.
    pub fn check(&self, config: &Fields) -> Result<(), SchemaError> {
        let present: Vec<String> = self
            .fields
            .iter()
            .filter(|field| lookup(config, field))
            .cloned()
            .collect();
        if self.kind.allows(present.len()) {
            Ok(())
        } else {
            Err(SchemaError::ConstraintViolation {
                kind: self.kind,
                fields: self.fields.clone(),
                present,
            })
        }
    }
}

fn lookup(config: &Fields, dotted: &str) -> bool {
    let segments: Vec<&str> = dotted.split('.').collect();
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    match config.get(*first) {
        Some(value) => value.get_path(rest).is_some(),
        None => false,
    }
}

/// A named, immutable tree of field descriptors plus constraint groups.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    pub name: String,
    /// Canonical asset type served by this schema, such as `container.googleapis.com/Cluster`.
    pub asset_type: String,
    /// Always an object descriptor with an empty name.
    pub root: FieldDescriptor,
    pub constraint_groups: Vec<ConstraintGroup>,
}

impl ResourceSchema {
    pub fn new(name: &str, asset_type: &str, fields: Vec<FieldDescriptor>) -> Self {
        let mut root = FieldDescriptor::object("", fields);
        root.assign_paths("");
        Self {
            name: name.to_string(),
            asset_type: asset_type.to_string(),
            root,
            constraint_groups: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, group: ConstraintGroup) -> Self {
        self.constraint_groups.push(group);
        self
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.root.kind {
            FieldKind::Object(children) => children,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Resolve a concrete configuration path (`a.0.b`) to its descriptor.
    pub fn descriptor_at(&self, dotted: &str) -> Option<&FieldDescriptor> {
        let mut current = &self.root;
        for segment in dotted.split('.') {
            current = match &current.kind {
                FieldKind::Object(children) => children.iter().find(|c| c.name == segment)?,
                FieldKind::List(elem) | FieldKind::Set(elem) | FieldKind::Map(elem) => elem,
                FieldKind::Scalar(_) => return None,
            };
        }
        Some(current)
    }

    /// Every descriptor in the schema, parents before children.
    pub fn descriptors(&self) -> Vec<&FieldDescriptor> {
        let mut out = Vec::new();
        for field in self.fields() {
            field.walk(&mut |fd| out.push(fd));
        }
        out
    }

    pub fn check_constraints(&self, config: &Fields) -> Result<(), SchemaError> {
        for group in &self.constraint_groups {
            group.check(config)?;
        }
        Ok(())
    }

    /// Structural problems with the descriptor tree, empty when the schema is usable.
    pub fn validate(&self) -> Vec<SchemaProblem> {
        let mut problems = Vec::new();
        for path in self.duplicate_names() {
            problems.push(SchemaProblem::new(&path, "duplicate field name"));
        }
        for fd in self.descriptors() {
            validate_descriptor(fd, &mut problems);
        }
        for group in &self.constraint_groups {
            for field in &group.fields {
                let exclusive = group.kind != ConstraintKind::AtLeastOne;
                match self.descriptor_at(field) {
                    None => problems.push(SchemaProblem::new(
                        field,
                        "constraint names an unknown field",
                    )),
                    Some(fd) if fd.default.is_some() && exclusive => {
                        problems.push(SchemaProblem::new(
                            field,
                            "defaulted fields are always present and cannot be in an exclusive group",
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        problems
    }

    /// Descriptor paths that appear more than once among siblings.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut dups = Vec::new();
        self.root.walk(&mut |fd| {
            if let Some(children) = fd.object_children() {
                let mut seen = BTreeSet::new();
                for child in children {
                    if !seen.insert(child.name.as_str()) {
                        dups.push(child.path.clone());
                    }
                }
            }
        });
        dups
    }
}

/// One structural problem found by [`ResourceSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProblem {
    pub path: String,
    pub message: String,
}

impl SchemaProblem {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn validate_descriptor(fd: &FieldDescriptor, problems: &mut Vec<SchemaProblem>) {
    let mut problem = |message: String| problems.push(SchemaProblem::new(&fd.path, message));
    let is_scalar = matches!(fd.kind, FieldKind::Scalar(_));

    if !fd.name.is_empty() && fd.wire.iter().any(String::is_empty) {
        problem("wire path has an empty segment".to_string());
    }
    if fd.wire.is_empty() && !fd.name.is_empty() {
        problem("wire path is empty".to_string());
    }

    if let Some(default) = &fd.default {
        match fd.kind {
            FieldKind::Scalar(ty) => match coerce_scalar(ty, default, &fd.path) {
                Ok(scalar) => {
                    if fd.omit_zero && !scalar.is_zero() {
                        problem("omit_zero needs a zero default".to_string());
                    }
                }
                Err(err) => problem(format!("invalid default: {err}")),
            },
            _ => problem("defaults are only supported on scalar fields".to_string()),
        }
    } else if fd.omit_zero {
        problem("omit_zero needs a zero default".to_string());
    }

    if fd.omit_zero && !is_scalar {
        problem("omit_zero is only supported on scalar fields".to_string());
    }
    if fd.absent == AbsentPolicy::EmitEmpty && is_scalar {
        problem("emit_empty is not supported on scalar fields".to_string());
    }
    if fd.int_as_string && !matches!(fd.kind, FieldKind::Scalar(super::ScalarType::Int)) {
        problem("int_as_string is only supported on int fields".to_string());
    }
    if fd.single_block {
        let of_objects = match &fd.kind {
            FieldKind::List(elem) => matches!(elem.kind, FieldKind::Object(_)),
            _ => false,
        };
        if !of_objects {
            problem("single_block needs a list of objects".to_string());
        }
        if fd.max_items != Some(1) {
            problem("single_block needs max_items = 1".to_string());
        }
    }
    if fd.synthesize_when_absent
        && !(matches!(fd.kind, FieldKind::Object(_)) || fd.single_block)
    {
        problem("synthesize_when_absent needs an object or single block".to_string());
    }
}

#[cfg(test)]
mod tests {
    use value_tree_core::{Fields, Value};

    use super::{ConstraintGroup, ConstraintKind, ResourceSchema};
    use crate::error::SchemaError;
    use crate::schema::FieldDescriptor;

    fn config(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn exactly_one_rejects_both_and_neither() {
        let group = ConstraintGroup::new(ConstraintKind::ExactlyOne, &["a", "b"]);

        assert!(group.check(&config(&[("a", Value::from(1))])).is_ok());
        assert!(matches!(
            group.check(&config(&[])),
            Err(SchemaError::ConstraintViolation { .. })
        ));
        let err = group
            .check(&config(&[("a", Value::from(1)), ("b", Value::from(""))]))
            .expect_err("both set");
        assert_eq!(
            err.to_string(),
            "constraint violation: exactly one of [a, b] (set: [a, b])"
        );
    }

    #[test]
    fn constraint_paths_reach_into_blocks() {
        let group = ConstraintGroup::new(
            ConstraintKind::MutuallyExclusive,
            &[
                "ip_allocation_policy.0.cluster_secondary_range_name",
                "ip_allocation_policy.0.cluster_ipv4_cidr_block",
            ],
        );
        let block = Value::List(vec![Value::object([
            ("cluster_secondary_range_name", Value::from("pods")),
            ("cluster_ipv4_cidr_block", Value::from("/14")),
        ])]);
        assert!(group
            .check(&config(&[("ip_allocation_policy", block)]))
            .is_err());
    }

    #[test]
    fn descriptor_at_resolves_indexed_paths() {
        let schema = ResourceSchema::new(
            "test",
            "test.example.com/Thing",
            vec![FieldDescriptor::block(
                "private_cluster_config",
                vec![FieldDescriptor::string("master_ipv4_cidr_block")],
            )],
        );
        let fd = schema
            .descriptor_at("private_cluster_config.0.master_ipv4_cidr_block")
            .expect("descriptor");
        assert_eq!(fd.path, "private_cluster_config.*.master_ipv4_cidr_block");
        assert!(schema.descriptor_at("missing").is_none());
        assert!(schema.duplicate_names().is_empty());
        assert!(schema.validate().is_empty());
    }

    #[test]
    fn validate_reports_inconsistent_descriptors() {
        let schema = ResourceSchema::new(
            "test",
            "test.example.com/Thing",
            vec![
                FieldDescriptor::string("name"),
                FieldDescriptor::string("name"),
                FieldDescriptor::bool("flag").with_default("sometimes"),
                FieldDescriptor::string("label").with_default("x").omit_zero(),
                FieldDescriptor::string("count").int_as_string(),
            ],
        )
        .with_constraint(ConstraintGroup::new(ConstraintKind::AtLeastOne, &["nope"]));

        let problems: Vec<String> = schema.validate().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            problems,
            vec![
                "name: duplicate field name".to_string(),
                "flag: invalid default: flag: expected bool, found string \"sometimes\""
                    .to_string(),
                "label: omit_zero needs a zero default".to_string(),
                "count: int_as_string is only supported on int fields".to_string(),
                "nope: constraint names an unknown field".to_string(),
            ]
        );
    }

    #[test]
    fn single_blocks_must_cap_at_one_item() {
        let widened =
            FieldDescriptor::block("policy", vec![FieldDescriptor::string("mode")]).max_items(3);
        let unbounded = FieldDescriptor {
            max_items: None,
            ..FieldDescriptor::block("window", vec![FieldDescriptor::string("start_time")])
        };
        let schema =
            ResourceSchema::new("test", "test.example.com/Thing", vec![widened, unbounded]);

        let problems: Vec<String> = schema.validate().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            problems,
            vec![
                "policy: single_block needs max_items = 1".to_string(),
                "window: single_block needs max_items = 1".to_string(),
            ]
        );
    }
}
