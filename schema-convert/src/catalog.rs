use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value as Json;
use value_tree_core::Fields;

use crate::equivalence::EquivalenceRegistry;
use crate::error::SchemaError;
use crate::expand::expand;
use crate::flatten::{flatten, Flattened};
use crate::harness::{run_round_trip, RoundTripReport};
use crate::identity::SelfLinkResolver;
use crate::schema::{load_definition, parse_definition, ResourceSchema, SchemaLoadError};

const BUILTIN: [(&str, &str); 2] = [
    (
        "container_cluster.toml",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/container_cluster.toml")),
    ),
    (
        "container_node_pool.toml",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/container_node_pool.toml")),
    ),
];

/// A schema together with the equivalence registry bound from it.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub schema: Arc<ResourceSchema>,
    pub registry: Arc<EquivalenceRegistry>,
}

impl SchemaEntry {
    pub fn new(schema: ResourceSchema, origin: &str) -> Result<Self, SchemaLoadError> {
        let registry = EquivalenceRegistry::from_schema(&schema).map_err(|err| {
            SchemaLoadError::Predicate {
                path: origin.to_string(),
                field: err.field,
                source: err.source,
            }
        })?;
        Ok(Self {
            schema: Arc::new(schema),
            registry: Arc::new(registry),
        })
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn expand(&self, config: &Fields) -> Result<Json, SchemaError> {
        expand(&self.schema, config)
    }

    pub fn flatten(&self, doc: &Json) -> Result<Flattened, SchemaError> {
        flatten(&self.schema, doc)
    }

    pub fn round_trip(
        &self,
        raw: &Fields,
        doc: &Json,
        ignore: &[String],
    ) -> Result<RoundTripReport, SchemaError> {
        run_round_trip(&self.schema, &self.registry, &SelfLinkResolver, raw, doc, ignore)
    }
}

/// Every resource schema known to the process, built once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entries: BTreeMap<String, SchemaEntry>,
}

impl SchemaCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog holding the embedded container schemas.
    pub fn builtin() -> Result<Self, SchemaLoadError> {
        let mut catalog = Self::empty();
        for (origin, raw) in BUILTIN {
            let origin = format!("embedded {origin}");
            let schema = parse_definition(raw, &origin)?;
            catalog.insert_from(schema, &origin)?;
        }
        tracing::info!(schemas = catalog.len(), "loaded built-in schemas");
        Ok(catalog)
    }

    /// Add a schema. Names must be unique within the catalog and the
    /// descriptor tree must pass [`ResourceSchema::validate`].
    pub fn insert(&mut self, schema: ResourceSchema) -> Result<(), SchemaLoadError> {
        let origin = schema.name.clone();
        self.insert_from(schema, &origin)
    }

    fn insert_from(&mut self, schema: ResourceSchema, origin: &str) -> Result<(), SchemaLoadError> {
        if let Some(problem) = schema.validate().into_iter().next() {
            return Err(SchemaLoadError::Invalid {
                path: origin.to_string(),
                field: problem.path,
                message: problem.message,
            });
        }
        if self.entries.contains_key(&schema.name) {
            return Err(SchemaLoadError::Duplicate {
                path: origin.to_string(),
                name: schema.name,
            });
        }
        let entry = SchemaEntry::new(schema, origin)?;
        self.entries.insert(entry.name().to_string(), entry);
        Ok(())
    }

    /// Load every `*.toml` definition in `dir`, in file-name order.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, SchemaLoadError> {
        let io_error = |source: std::io::Error| SchemaLoadError::Io {
            path: dir.display().to_string(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let schema = load_definition(path)?;
            self.insert_from(schema, &path.display().to_string())?;
        }
        tracing::info!(dir = %dir.display(), schemas = paths.len(), "loaded schema definitions");
        Ok(paths.len())
    }

    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.entries.get(name)
    }

    pub fn by_asset_type(&self, asset_type: &str) -> Option<&SchemaEntry> {
        self.entries
            .values()
            .find(|entry| entry.schema.asset_type == asset_type)
    }

    /// Look up by schema name first, then by asset type.
    pub fn resolve(&self, name_or_type: &str) -> Option<&SchemaEntry> {
        self.get(name_or_type)
            .or_else(|| self.by_asset_type(name_or_type))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
