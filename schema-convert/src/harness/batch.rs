use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;
use value_tree_core::{parse_file, Fields, ParseError};

use crate::asset::{AssetLoadError, DocumentSource, FileDocumentSource};
use crate::catalog::SchemaCatalog;
use crate::error::SchemaError;
use crate::harness::RoundTripReport;

/// One independent round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCase {
    pub label: String,
    /// Schema name or canonical asset type.
    pub schema: String,
    pub raw: Fields,
    pub document: Json,
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseOutcome {
    Completed { report: RoundTripReport },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub label: String,
    pub schema: String,
    pub outcome: CaseOutcome,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, CaseOutcome::Completed { report } if report.passed())
    }
}

/// Results of a batch, in the order the cases were given.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<CaseResult>,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(CaseResult::passed)
    }
}

/// Run every case on the rayon pool. A failing case never stops the others.
pub fn run_batch(catalog: &SchemaCatalog, cases: &[BatchCase]) -> BatchReport {
    let results = cases
        .par_iter()
        .map(|case| CaseResult {
            label: case.label.clone(),
            schema: case.schema.clone(),
            outcome: match run_case(catalog, case) {
                Ok(report) => CaseOutcome::Completed { report },
                Err(err) => {
                    tracing::warn!(case = %case.label, error = %err, "round trip failed");
                    CaseOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            },
        })
        .collect();
    BatchReport { results }
}

fn run_case(catalog: &SchemaCatalog, case: &BatchCase) -> Result<RoundTripReport, SchemaError> {
    let entry = catalog
        .resolve(&case.schema)
        .ok_or_else(|| SchemaError::UnknownSchema(case.schema.clone()))?;
    entry.round_trip(&case.raw, &case.document, &case.ignore)
}

/// Errors returned when reading a batch manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("case {label}: {source}")]
    Config { label: String, source: ParseError },
    #[error("case {label}: {source}")]
    Asset {
        label: String,
        source: AssetLoadError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default, rename = "case")]
    cases: Vec<CaseDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseDef {
    label: String,
    schema: String,
    config: PathBuf,
    assets: PathBuf,
    /// Asset address; defaults to the label.
    address: Option<String>,
    #[serde(default)]
    ignore: Vec<String>,
}

/// Read a TOML batch manifest. Relative paths resolve against the
/// manifest's directory.
pub fn load_manifest(path: &Path) -> Result<Vec<BatchCase>, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: ManifestFile = toml::from_str(&raw).map_err(|source| ManifestError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut cases = Vec::with_capacity(parsed.cases.len());
    for def in parsed.cases {
        let raw = parse_file(&base.join(&def.config)).map_err(|source| ManifestError::Config {
            label: def.label.clone(),
            source,
        })?;
        let asset_error = |source: AssetLoadError| ManifestError::Asset {
            label: def.label.clone(),
            source,
        };
        let assets = FileDocumentSource::open(&base.join(&def.assets)).map_err(asset_error)?;
        let address = def.address.as_deref().unwrap_or(&def.label);
        let asset = assets.fetch(address).map_err(asset_error)?;
        let document = asset.document().map_err(asset_error)?.clone();

        cases.push(BatchCase {
            label: def.label,
            schema: def.schema,
            raw,
            document,
            ignore: def.ignore,
        });
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use value_tree_core::{Fields, Value};

    use super::{run_batch, BatchCase, CaseOutcome};
    use crate::catalog::SchemaCatalog;

    fn case(label: &str, schema: &str, raw: Fields, document: serde_json::Value) -> BatchCase {
        BatchCase {
            label: label.to_string(),
            schema: schema.to_string(),
            raw,
            document,
            ignore: Vec::new(),
        }
    }

    fn named(name: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), Value::from(name));
        fields
    }

    #[test]
    fn failures_are_recorded_in_input_order() {
        let catalog = SchemaCatalog::builtin().expect("catalog");
        let cases = vec![
            case("ok", "google_container_cluster", named("a"), json!({"name": "a"})),
            case("unknown", "no_such_schema", named("b"), json!({"name": "b"})),
            case(
                "bad-doc",
                "container.googleapis.com/Cluster",
                named("c"),
                json!({"name": "c", "initialNodeCount": "lots"}),
            ),
            case("missing", "google_container_node_pool", named("d"), json!({})),
        ];

        let report = run_batch(&catalog, &cases);
        let labels: Vec<&str> = report.results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["ok", "unknown", "bad-doc", "missing"]);

        assert!(report.results[0].passed());
        assert!(matches!(
            &report.results[1].outcome,
            CaseOutcome::Failed { error } if error == "unknown resource schema: no_such_schema"
        ));
        assert!(matches!(&report.results[2].outcome, CaseOutcome::Failed { .. }));
        match &report.results[3].outcome {
            CaseOutcome::Completed { report } => {
                assert_eq!(report.missing_fields(), vec!["name".to_string()])
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 3);
        assert!(!report.all_passed());
    }
}
