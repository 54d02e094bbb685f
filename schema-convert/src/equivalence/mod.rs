//! Field-path keyed equivalence predicates.
//!
//! A registry maps path patterns (`node_pool.*.version`) to named predicates.
//! Lookups pick the most specific matching pattern; structurally equal values
//! are always equivalent, and paths without a predicate fall back to
//! structural equality.

mod families;
mod pattern;
mod predicate;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use value_tree_core::{Fields, Value};

use crate::schema::ResourceSchema;

pub use families::parse_duration;
pub use pattern::PathPattern;
pub use predicate::{
    build_predicate, families, EquivalenceContext, EquivalencePredicate, PredicateError,
    PredicateFactory,
};

/// A descriptor named a predicate reference that does not build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {source}")]
pub struct PredicateBindingError {
    pub field: String,
    pub source: PredicateError,
}

/// Lookup from field-path pattern to equivalence predicate.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceRegistry {
    entries: Vec<(PathPattern, Arc<dyn EquivalencePredicate>)>,
}

impl EquivalenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every descriptor's equivalence reference under its schema path.
    pub fn from_schema(schema: &ResourceSchema) -> Result<Self, PredicateBindingError> {
        let mut registry = Self::new();
        for fd in schema.descriptors() {
            let Some(reference) = &fd.equivalence else {
                continue;
            };
            registry
                .register_reference(&fd.path, reference)
                .map_err(|source| PredicateBindingError {
                    field: fd.path.clone(),
                    source,
                })?;
        }
        tracing::debug!(
            schema = %schema.name,
            predicates = registry.len(),
            "bound equivalence predicates"
        );
        Ok(registry)
    }

    /// Register `predicate` for every path matching `pattern`. On equal
    /// specificity the later registration wins.
    pub fn register(&mut self, pattern: &str, predicate: Arc<dyn EquivalencePredicate>) {
        self.entries.push((PathPattern::parse(pattern), predicate));
    }

    /// Register a predicate built from a `family[:argument]` reference.
    pub fn register_reference(
        &mut self,
        pattern: &str,
        reference: &str,
    ) -> Result<(), PredicateError> {
        let predicate = build_predicate(reference)?;
        self.register(pattern, predicate);
        Ok(())
    }

    /// Most specific predicate registered for a concrete path.
    pub fn lookup(&self, path: &str) -> Option<&Arc<dyn EquivalencePredicate>> {
        let mut best: Option<(usize, &Arc<dyn EquivalencePredicate>)> = None;
        for (pattern, predicate) in &self.entries {
            if !pattern.matches(path) {
                continue;
            }
            let specificity = pattern.specificity();
            if best.map_or(true, |(current, _)| specificity >= current) {
                best = Some((specificity, predicate));
            }
        }
        best.map(|(_, predicate)| predicate)
    }

    pub fn has_predicate(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Whether `old` and `new` mean the same thing at `path`.
    ///
    /// A predicate that errors or panics counts as "not equivalent"; the
    /// failure is logged and the comparison continues.
    pub fn is_equivalent(
        &self,
        path: &str,
        old: Option<&Value>,
        new: Option<&Value>,
        config: &Fields,
    ) -> bool {
        if old == new {
            return true;
        }
        let Some(predicate) = self.lookup(path) else {
            return false;
        };

        let ctx = EquivalenceContext::new(path, config);
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| predicate.is_equivalent(old, new, &ctx)));
        match outcome {
            Ok(Ok(equivalent)) => equivalent,
            Ok(Err(err)) => {
                tracing::warn!(
                    path,
                    predicate = predicate.name(),
                    error = %err,
                    "equivalence predicate failed"
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    path,
                    predicate = predicate.name(),
                    "equivalence predicate panicked"
                );
                false
            }
        }
    }

    /// Registered patterns and predicate names, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&PathPattern, &str)> {
        self.entries
            .iter()
            .map(|(pattern, predicate)| (pattern, predicate.name()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
