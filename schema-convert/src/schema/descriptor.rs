use std::fmt;

use convert_case::{Case, Casing};
use value_tree_core::Value;

/// Declared type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Bool,
    Int,
    Float,
}

impl ScalarType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(ScalarType::String),
            "bool" => Some(ScalarType::Bool),
            "int" => Some(ScalarType::Int),
            "float" => Some(ScalarType::Float),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinality and shape of a field.
///
/// Repeated and map kinds carry exactly one element descriptor; nested
/// objects own their children, so a schema is always a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarType),
    List(Box<FieldDescriptor>),
    Set(Box<FieldDescriptor>),
    Map(Box<FieldDescriptor>),
    Object(Vec<FieldDescriptor>),
}

impl FieldKind {
    pub fn label(&self) -> String {
        match self {
            FieldKind::Scalar(t) => t.to_string(),
            FieldKind::List(elem) => format!("list<{}>", elem.kind.label()),
            FieldKind::Set(elem) => format!("set<{}>", elem.kind.label()),
            FieldKind::Map(elem) => format!("map<{}>", elem.kind.label()),
            FieldKind::Object(_) => "object".to_string(),
        }
    }
}

/// What expand writes for a field that is absent from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbsentPolicy {
    /// Leave the key out of the canonical document.
    #[default]
    Omit,
    /// Write an empty object (or empty array) to signal "present but disabled".
    EmitEmpty,
}

/// Schema node describing one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Configuration key. Empty for element descriptors and the root.
    pub name: String,
    /// Schema path pattern, `*` standing for element positions
    /// (`private_cluster_config.*.master_ipv4_cidr_block`).
    pub path: String,
    pub kind: FieldKind,
    /// Location of the value in the canonical document, relative to the
    /// owning object. More than one segment relocates the field.
    pub wire: Vec<String>,
    pub computed: bool,
    pub required: bool,
    /// Installed by flatten when the canonical document omits the field.
    pub default: Option<Value>,
    /// Equivalence predicate reference, `family` or `family:argument`.
    pub equivalence: Option<String>,
    pub max_items: Option<usize>,
    /// A list of at most one object in configuration, a plain object on the wire.
    pub single_block: bool,
    pub absent: AbsentPolicy,
    /// Present-but-zero scalars are left out of the canonical document.
    pub omit_zero: bool,
    /// Flatten builds the block from its children's defaults when the
    /// canonical document omits it.
    pub synthesize_when_absent: bool,
    /// 64-bit integers travel as JSON strings.
    pub int_as_string: bool,
    pub description: Option<String>,
}

impl FieldDescriptor {
    fn with_kind(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            path: name.to_string(),
            kind,
            wire: default_wire(name),
            computed: false,
            required: false,
            default: None,
            equivalence: None,
            max_items: None,
            single_block: false,
            absent: AbsentPolicy::Omit,
            omit_zero: false,
            synthesize_when_absent: false,
            int_as_string: false,
            description: None,
        }
    }

    pub fn scalar(name: &str, ty: ScalarType) -> Self {
        Self::with_kind(name, FieldKind::Scalar(ty))
    }

    pub fn string(name: &str) -> Self {
        Self::scalar(name, ScalarType::String)
    }

    pub fn bool(name: &str) -> Self {
        Self::scalar(name, ScalarType::Bool)
    }

    pub fn int(name: &str) -> Self {
        Self::scalar(name, ScalarType::Int)
    }

    pub fn float(name: &str) -> Self {
        Self::scalar(name, ScalarType::Float)
    }

    pub fn list(name: &str, element: FieldDescriptor) -> Self {
        Self::with_kind(name, FieldKind::List(Box::new(element)))
    }

    pub fn set(name: &str, element: FieldDescriptor) -> Self {
        Self::with_kind(name, FieldKind::Set(Box::new(element)))
    }

    pub fn map(name: &str, value: FieldDescriptor) -> Self {
        Self::with_kind(name, FieldKind::Map(Box::new(value)))
    }

    pub fn object(name: &str, children: Vec<FieldDescriptor>) -> Self {
        Self::with_kind(name, FieldKind::Object(children))
    }

    /// A single nested block: list of at most one object in configuration.
    pub fn block(name: &str, children: Vec<FieldDescriptor>) -> Self {
        let mut fd = Self::list(name, Self::element_object(children));
        fd.single_block = true;
        fd.max_items = Some(1);
        fd
    }

    /// Element descriptor holding a scalar.
    pub fn element(ty: ScalarType) -> Self {
        Self::scalar("", ty)
    }

    /// Element descriptor holding a nested object.
    pub fn element_object(children: Vec<FieldDescriptor>) -> Self {
        Self::object("", children)
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn equivalence(mut self, reference: &str) -> Self {
        self.equivalence = Some(reference.to_string());
        self
    }

    /// Override the wire location with a dotted path.
    pub fn wire(mut self, dotted: &str) -> Self {
        self.wire = dotted.split('.').map(str::to_string).collect();
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn emit_empty(mut self) -> Self {
        self.absent = AbsentPolicy::EmitEmpty;
        self
    }

    /// Leave present zero values out of the canonical document. Flatten then
    /// reads the omission back as the zero default.
    pub fn omit_zero(mut self) -> Self {
        self.omit_zero = true;
        if self.default.is_none() {
            if let FieldKind::Scalar(ty) = self.kind {
                self.default = Some(zero_value(ty));
            }
        }
        self
    }

    pub fn synthesize_when_absent(mut self) -> Self {
        self.synthesize_when_absent = true;
        self
    }

    pub fn int_as_string(mut self) -> Self {
        self.int_as_string = true;
        self
    }

    pub fn describe(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    /// Children of an object field, or of the object elements of a repeated field.
    pub fn object_children(&self) -> Option<&[FieldDescriptor]> {
        match &self.kind {
            FieldKind::Object(children) => Some(children),
            FieldKind::List(elem) | FieldKind::Set(elem) | FieldKind::Map(elem) => {
                match &elem.kind {
                    FieldKind::Object(children) => Some(children),
                    _ => None,
                }
            }
            FieldKind::Scalar(_) => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&FieldDescriptor> {
        self.object_children()?.iter().find(|c| c.name == name)
    }

    pub fn wire_display(&self) -> String {
        self.wire.join(".")
    }

    /// Rewrite `path` on this descriptor and every descendant.
    pub(crate) fn assign_paths(&mut self, path: &str) {
        self.path = path.to_string();
        match &mut self.kind {
            FieldKind::Scalar(_) => {}
            FieldKind::List(elem) | FieldKind::Set(elem) | FieldKind::Map(elem) => {
                elem.assign_paths(&child_path(path, "*"));
            }
            FieldKind::Object(children) => {
                for child in children {
                    let name = child.name.clone();
                    child.assign_paths(&child_path(path, &name));
                }
            }
        }
    }

    /// Depth-first walk over this descriptor and its descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a FieldDescriptor)) {
        visit(self);
        match &self.kind {
            FieldKind::Scalar(_) => {}
            FieldKind::List(elem) | FieldKind::Set(elem) | FieldKind::Map(elem) => {
                elem.walk(visit)
            }
            FieldKind::Object(children) => {
                for child in children {
                    child.walk(visit);
                }
            }
        }
    }
}

/// Zero value of a scalar type.
pub fn zero_value(ty: ScalarType) -> Value {
    match ty {
        ScalarType::String => Value::from(""),
        ScalarType::Bool => Value::from(false),
        ScalarType::Int => Value::from(0i64),
        ScalarType::Float => Value::from(0.0),
    }
}

fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

fn default_wire(name: &str) -> Vec<String> {
    if name.is_empty() {
        Vec::new()
    } else {
        vec![name.to_case(Case::Camel)]
    }
}
