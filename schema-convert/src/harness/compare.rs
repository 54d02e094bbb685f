use serde::Serialize;
use value_tree_core::{join_path, Fields, Value};

use crate::equivalence::EquivalenceRegistry;

/// One export-fidelity mismatch between the raw and exported configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Divergence {
    /// Set in the raw configuration, absent after export.
    Missing { path: String, raw: Value },
    /// Present on both sides but neither equal nor equivalent.
    NotEquivalent {
        path: String,
        raw: Value,
        exported: Value,
    },
}

impl Divergence {
    pub fn path(&self) -> &str {
        match self {
            Divergence::Missing { path, .. } | Divergence::NotEquivalent { path, .. } => path,
        }
    }
}

/// Whether `key` is covered by the ignore list: an exact entry, or an entry
/// naming one of its index-free prefixes (`a.0.b` is covered by `a` and `a.b`).
pub fn is_ignored(key: &str, ignore: &[String]) -> bool {
    if ignore.iter().any(|entry| entry == key) {
        return true;
    }
    if !key.contains('.') {
        return false;
    }

    let mut partial = String::new();
    for part in key.split('.').filter(|part| part.parse::<i64>().is_err()) {
        if !partial.is_empty() {
            partial.push('.');
        }
        partial.push_str(part);
        if ignore.iter().any(|entry| *entry == partial) {
            return true;
        }
    }
    false
}

/// Compare every non-zero value of `raw` against `exported`.
///
/// Zero raw values are skipped since the API legitimately drops them. Lists
/// pair elements by position, sets by element identity, maps and objects by
/// key. Every mismatch is collected.
pub fn compare_export(
    registry: &EquivalenceRegistry,
    raw: &Fields,
    exported: &Fields,
    ignore: &[String],
) -> Vec<Divergence> {
    let mut out = Vec::new();
    let walker = Walker {
        registry,
        config: raw,
        ignore,
    };
    for (key, value) in raw {
        walker.compare(key, value, exported.get(key), &mut out);
    }
    out
}

struct Walker<'a> {
    registry: &'a EquivalenceRegistry,
    config: &'a Fields,
    ignore: &'a [String],
}

impl Walker<'_> {
    fn compare(
        &self,
        path: &str,
        raw: &Value,
        exported: Option<&Value>,
        out: &mut Vec<Divergence>,
    ) {
        if is_ignored(path, self.ignore) || raw.is_zero() {
            return;
        }
        if self.registry.has_predicate(path)
            && self.registry.is_equivalent(path, Some(raw), exported, self.config)
        {
            return;
        }

        let Some(exported) = exported else {
            self.report_missing(path, raw, out);
            return;
        };

        match (raw, exported) {
            (Value::List(items), Value::List(theirs)) => {
                for (idx, item) in items.iter().enumerate() {
                    self.compare(&format!("{path}.{idx}"), item, theirs.get(idx), out);
                }
            }
            (Value::Set(items), Value::Set(theirs)) => self.pair_members(path, items, theirs, out),
            (Value::Map(fields), Value::Map(theirs))
            | (Value::Object(fields), Value::Object(theirs)) => {
                for (key, value) in fields {
                    self.compare(&join_path(path, key), value, theirs.get(key), out);
                }
            }
            (Value::Scalar(_), Value::Scalar(_)) if raw == exported => {}
            _ => out.push(Divergence::NotEquivalent {
                path: path.to_string(),
                raw: raw.clone(),
                exported: exported.clone(),
            }),
        }
    }

    /// Pair set members by identity. Each exported member is claimed at most once.
    fn pair_members(
        &self,
        path: &str,
        items: &[Value],
        theirs: &[Value],
        out: &mut Vec<Divergence>,
    ) {
        let mut unclaimed: Vec<Option<&Value>> = theirs.iter().map(Some).collect();
        for (idx, item) in items.iter().enumerate() {
            if item.is_zero() {
                continue;
            }
            let item_path = format!("{path}.{idx}");
            let slot = unclaimed.iter_mut().find(
                |slot| matches!(slot, Some(candidate) if self.matches(&item_path, item, candidate)),
            );
            match slot {
                Some(slot) => *slot = None,
                None => self.compare(&item_path, item, theirs.get(idx), out),
            }
        }
    }

    /// Dry-run comparison used to pair set elements.
    fn matches(&self, path: &str, raw: &Value, candidate: &Value) -> bool {
        let mut scratch = Vec::new();
        self.compare(path, raw, Some(candidate), &mut scratch);
        scratch.is_empty()
    }

    /// Report every non-zero leaf under a value that has no exported counterpart.
    fn report_missing(&self, path: &str, raw: &Value, out: &mut Vec<Divergence>) {
        match raw {
            Value::List(items) | Value::Set(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.compare(&format!("{path}.{idx}"), item, None, out);
                }
            }
            Value::Map(fields) | Value::Object(fields) => {
                for (key, value) in fields {
                    self.compare(&join_path(path, key), value, None, out);
                }
            }
            Value::Scalar(_) => out.push(Divergence::Missing {
                path: path.to_string(),
                raw: raw.clone(),
            }),
        }
    }
}
