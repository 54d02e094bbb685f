//! Round-trip validation of a schema against real canonical documents.
//!
//! A round trip runs in two phases:
//!
//! 1. Export fidelity: the canonical document is flattened and every non-zero
//!    value of the raw configuration must reappear, equal or equivalent per
//!    the registry, unless the caller ignores its path.
//! 2. Stability: the exported configuration is expanded and flattened again
//!    and must come back exactly equal.
//!
//! Both phases collect every mismatch rather than stopping at the first.

pub mod batch;
pub mod compare;

use serde::Serialize;
use serde_json::Value as Json;
use value_tree_core::{diff, DiffEntry, Fields};

use crate::coerce::conform;
use crate::equivalence::EquivalenceRegistry;
use crate::error::SchemaError;
use crate::expand::expand;
use crate::flatten::{flatten, UnknownFieldWarning};
use crate::identity::IdentityResolver;
use crate::schema::ResourceSchema;

pub use batch::{
    load_manifest, run_batch, BatchCase, BatchReport, CaseOutcome, CaseResult, ManifestError,
};
pub use compare::{compare_export, is_ignored, Divergence};

/// Outcome of one resource's round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTripReport {
    /// Address of the resource, when the document names one.
    pub address: Option<String>,
    /// Export-fidelity mismatches.
    pub divergences: Vec<Divergence>,
    /// Differences between the exported and the re-flattened configuration.
    pub stability_diff: Vec<DiffEntry>,
    /// Canonical keys the schema does not describe.
    pub warnings: Vec<UnknownFieldWarning>,
    #[serde(skip)]
    pub exported: Fields,
}

impl RoundTripReport {
    /// Paths that failed the export-fidelity phase.
    pub fn missing_fields(&self) -> Vec<String> {
        self.divergences
            .iter()
            .map(|d| d.path().to_string())
            .collect()
    }

    /// Paths that failed the stability phase.
    pub fn stability_paths(&self) -> Vec<String> {
        self.stability_diff
            .iter()
            .map(|entry| entry.path().to_string())
            .collect()
    }

    pub fn passed(&self) -> bool {
        self.divergences.is_empty() && self.stability_diff.is_empty()
    }
}

/// Run both round-trip phases for one resource.
///
/// `identity` names the resource in the report and in log lines. Type errors
/// in either input, or constraint violations while re-expanding the exported
/// configuration, abort with a [`SchemaError`].
pub fn run_round_trip(
    schema: &ResourceSchema,
    registry: &EquivalenceRegistry,
    identity: &dyn IdentityResolver,
    raw: &Fields,
    doc: &Json,
    ignore: &[String],
) -> Result<RoundTripReport, SchemaError> {
    let address = identity.address(doc);
    let raw = conform(schema, raw)?;

    let exported = flatten(schema, doc)?;
    let divergences = compare_export(registry, &raw, &exported.config, ignore);

    let roundtrip_doc = expand(schema, &exported.config)?;
    let roundtrip = flatten(schema, &roundtrip_doc)?;
    let stability_diff: Vec<DiffEntry> = diff(&exported.config, &roundtrip.config)
        .into_iter()
        .filter(DiffEntry::is_change)
        .collect();

    let label = address.as_deref().unwrap_or("<unnamed>");
    for divergence in &divergences {
        tracing::debug!(
            schema = %schema.name,
            resource = label,
            path = divergence.path(),
            "export divergence"
        );
    }
    if !stability_diff.is_empty() {
        tracing::warn!(
            schema = %schema.name,
            resource = label,
            differences = stability_diff.len(),
            "round trip is not a fixed point"
        );
    }

    Ok(RoundTripReport {
        address,
        divergences,
        stability_diff,
        warnings: exported.warnings,
        exported: exported.config,
    })
}
