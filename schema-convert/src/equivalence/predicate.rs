use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use value_tree_core::{Fields, Value};

/// Errors raised while building or evaluating an equivalence predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("unknown predicate family {0:?}")]
    UnknownFamily(String),
    #[error("predicate family {family} requires an argument")]
    MissingArgument { family: String },
    #[error("predicate family {family}: invalid argument {argument:?}: {message}")]
    InvalidArgument {
        family: String,
        argument: String,
        message: String,
    },
    #[error("{predicate}: expected {expected}, found {found}")]
    UnexpectedType {
        predicate: String,
        expected: String,
        found: String,
    },
    #[error("{predicate}: cannot interpret {value}")]
    Malformed { predicate: String, value: String },
}

/// Read-only view handed to predicates: the compared path and the owning
/// configuration tree.
#[derive(Debug, Clone, Copy)]
pub struct EquivalenceContext<'a> {
    path: &'a str,
    config: &'a Fields,
}

impl<'a> EquivalenceContext<'a> {
    pub fn new(path: &'a str, config: &'a Fields) -> Self {
        Self { path, config }
    }

    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn config(&self) -> &'a Fields {
        self.config
    }

    /// Value at an absolute dotted path in the owning configuration.
    pub fn get(&self, dotted: &str) -> Option<&'a Value> {
        let segments: Vec<&str> = dotted.split('.').collect();
        let (first, rest) = segments.split_first()?;
        self.config.get(*first)?.get_path(rest)
    }

    /// Value at a path relative to the parent of the compared field.
    pub fn sibling(&self, relative: &str) -> Option<&'a Value> {
        match self.path.rsplit_once('.') {
            Some((parent, _)) => self.get(&format!("{parent}.{relative}")),
            None => self.get(relative),
        }
    }
}

/// A named rule deciding whether two values of a field mean the same thing.
///
/// Predicates are pure. They may read the owning configuration through the
/// context but never change it. `None` stands for an absent value.
pub trait EquivalencePredicate: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether swapping `old` and `new` can never change the answer.
    fn symmetric(&self) -> bool {
        true
    }

    fn is_equivalent(
        &self,
        old: Option<&Value>,
        new: Option<&Value>,
        ctx: &EquivalenceContext<'_>,
    ) -> Result<bool, PredicateError>;
}

/// Link-time registration of a predicate family.
pub struct PredicateFactory {
    pub family: &'static str,
    pub summary: &'static str,
    pub build: fn(Option<&str>) -> Result<Arc<dyn EquivalencePredicate>, PredicateError>,
}

inventory::collect!(PredicateFactory);

/// Build a predicate from a `family` or `family:argument` reference.
pub fn build_predicate(reference: &str) -> Result<Arc<dyn EquivalencePredicate>, PredicateError> {
    let (family, argument) = match reference.split_once(':') {
        Some((family, argument)) => (family.trim(), Some(argument.trim())),
        None => (reference.trim(), None),
    };
    for factory in inventory::iter::<PredicateFactory> {
        if factory.family == family {
            return (factory.build)(argument);
        }
    }
    Err(PredicateError::UnknownFamily(family.to_string()))
}

/// Every registered predicate family, sorted by name.
pub fn families() -> Vec<&'static PredicateFactory> {
    let mut out: Vec<&'static PredicateFactory> = Vec::new();
    for factory in inventory::iter::<PredicateFactory> {
        out.push(factory);
    }
    out.sort_by_key(|factory| factory.family);
    out
}

pub(crate) fn no_argument(family: &str, argument: Option<&str>) -> Result<(), PredicateError> {
    match argument {
        Some(argument) if !argument.is_empty() => Err(PredicateError::InvalidArgument {
            family: family.to_string(),
            argument: argument.to_string(),
            message: "takes no argument".to_string(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn required_argument<'a>(
    family: &str,
    argument: Option<&'a str>,
) -> Result<&'a str, PredicateError> {
    match argument {
        Some(argument) if !argument.is_empty() => Ok(argument),
        _ => Err(PredicateError::MissingArgument {
            family: family.to_string(),
        }),
    }
}
