//! Field descriptors, resource schemas and their TOML definitions.

pub mod definition;
pub mod descriptor;
pub mod resource;

pub use definition::{load_definition, parse_definition, SchemaLoadError};
pub use descriptor::{AbsentPolicy, FieldDescriptor, FieldKind, ScalarType};
pub use resource::{ConstraintGroup, ConstraintKind, ResourceSchema, SchemaProblem};
