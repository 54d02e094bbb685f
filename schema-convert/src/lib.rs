//! Schema-driven conversion between configuration trees and canonical
//! resource documents.
//!
//! A configuration tree is what an author writes: nested blocks, lists and
//! maps of typed scalars. A canonical document is the JSON object a cloud
//! control-plane API accepts and returns for the same resource. The two carry
//! the same information in different shapes, and the API adds quirks of its
//! own: it drops zero values, relocates fields into nested objects, returns
//! `"01:00"` for `"1:00"`, and omits disabled feature blocks. This crate
//! describes each resource once, as a tree of field descriptors, and derives
//! both directions of the conversion from it.
//!
//! # Architecture
//!
//! ## Schema model
//!
//! - [`schema`] - Field descriptors, resource schemas, constraint groups and
//!   the TOML definition format
//! - [`catalog`] - Every known schema with its bound equivalence registry,
//!   built once and shared read-only
//!
//! ## Conversion
//!
//! - [`expand`] - Configuration tree to canonical document
//! - [`flatten`] - Canonical document to configuration tree, with schema-drift
//!   warnings
//! - [`coerce`] - Scalar coercion against declared types
//!
//! ## Equivalence
//!
//! - [`equivalence`] - Path-pattern lookup of named predicates that decide
//!   when two literally different values mean the same thing
//! - [`identity`] - Resource identity for self links and short names
//!
//! ## Validation
//!
//! - [`harness`] - Export-fidelity and stability phases, single and batched
//! - [`asset`] - Canonical documents wrapped in asset-inventory records
//!
//! ## Reporting
//!
//! - [`report`] - Terminal-friendly colored output
//! - [`inspect`] - Schema tree visualization
//!
//! # Workflow
//!
//! 1. **Load** the catalog (embedded schemas plus an optional directory)
//! 2. **Expand** an authored configuration into the document the API expects
//! 3. **Flatten** an exported document back into configuration
//! 4. **Round-trip** both against each other to prove nothing is lost
//!
//! # Examples
//!
//! ```ignore
//! use schema_convert::catalog::SchemaCatalog;
//! use std::path::Path;
//! use value_tree_core::parse_file;
//!
//! let catalog = SchemaCatalog::builtin()?;
//! let cluster = catalog.resolve("container.googleapis.com/Cluster").expect("built-in");
//! let config = parse_file(Path::new("cluster.json"))?;
//! let document = cluster.expand(&config)?;
//! let back = cluster.flatten(&document)?;
//! assert!(back.warnings.is_empty());
//! ```
//!
//! # Built on value-tree-core
//!
//! The tagged value model, JSON parsing and structural diffing live in
//! `value-tree-core`. All schema-specific logic is contained in this crate.

pub mod asset;
pub mod catalog;
pub mod coerce;
pub mod equivalence;
pub mod error;
pub mod expand;
pub mod flatten;
pub mod harness;
pub mod identity;
pub mod inspect;
pub mod report;
pub mod schema;

pub use catalog::{SchemaCatalog, SchemaEntry};
pub use equivalence::{EquivalencePredicate, EquivalenceRegistry};
pub use error::SchemaError;
pub use expand::expand;
pub use flatten::{flatten, Flattened, UnknownFieldWarning};
pub use harness::{run_batch, run_round_trip, BatchReport, RoundTripReport};
pub use identity::{IdentityResolver, ResourceIdentity, SelfLinkResolver};
pub use schema::{FieldDescriptor, ResourceSchema};
