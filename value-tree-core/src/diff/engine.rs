use std::collections::BTreeSet;

use crate::diff::result::DiffEntry;
use crate::{Fields, Value};

/// Configures tree diff behavior.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Include [`DiffEntry::Identical`] rows.
    pub include_identical: bool,
    /// Maximum nesting depth to descend into. `None` means unlimited.
    pub max_depth: Option<usize>,
    /// Paths (or bare field names) to skip.
    pub ignore_paths: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_identical: false,
            max_depth: None,
            ignore_paths: Vec::new(),
        }
    }
}

/// Diff two configuration trees with default options.
pub fn diff(left: &Fields, right: &Fields) -> Vec<DiffEntry> {
    diff_with_options(left, right, &DiffOptions::default())
}

/// Diff two configuration trees.
///
/// Lists pair elements by position, sets by value, maps and objects by key.
pub fn diff_with_options(left: &Fields, right: &Fields, opts: &DiffOptions) -> Vec<DiffEntry> {
    let mut walker = Walker {
        opts,
        out: Vec::new(),
    };
    walker.fields(left, right, "", 0);
    walker.out
}

/// Diff two values rooted at `path`.
pub fn diff_values(left: &Value, right: &Value, path: &str, opts: &DiffOptions) -> Vec<DiffEntry> {
    let mut walker = Walker {
        opts,
        out: Vec::new(),
    };
    walker.value(left, right, path, 0);
    walker.out
}

/// Join a parent path and a child segment with a dot.
pub fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

struct Walker<'a> {
    opts: &'a DiffOptions,
    out: Vec<DiffEntry>,
}

impl Walker<'_> {
    fn too_deep(&self, depth: usize) -> bool {
        self.opts.max_depth.is_some_and(|max| depth > max)
    }

    fn ignored(&self, path: &str) -> bool {
        self.opts.ignore_paths.iter().any(|ignore| {
            path == ignore
                || path
                    .strip_prefix(ignore.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
                || path.split('.').any(|segment| segment == ignore)
        })
    }

    fn one_sided(&mut self, path: String, left: Option<&Value>, right: Option<&Value>) {
        match (left, right) {
            (Some(value), None) => self.out.push(DiffEntry::OnlyLeft {
                path,
                value: value.clone(),
            }),
            (None, Some(value)) => self.out.push(DiffEntry::OnlyRight {
                path,
                value: value.clone(),
            }),
            _ => {}
        }
    }

    fn fields(&mut self, left: &Fields, right: &Fields, prefix: &str, depth: usize) {
        if self.too_deep(depth) {
            return;
        }
        let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
        for key in keys {
            let path = join_path(prefix, key);
            if self.ignored(&path) {
                continue;
            }
            match (left.get(key), right.get(key)) {
                (Some(l), Some(r)) => self.value(l, r, &path, depth),
                (l, r) => self.one_sided(path, l, r),
            }
        }
    }

    fn value(&mut self, left: &Value, right: &Value, path: &str, depth: usize) {
        if self.ignored(path) || self.too_deep(depth) {
            return;
        }
        let before = self.out.len();

        match (left, right) {
            (Value::Scalar(l), Value::Scalar(r)) => {
                if l != r {
                    self.out.push(DiffEntry::Modified {
                        path: path.to_string(),
                        left: left.to_string(),
                        right: right.to_string(),
                    });
                }
            }
            (Value::List(l), Value::List(r)) => self.positional(l, r, path, depth),
            (Value::Set(l), Value::Set(r)) => self.by_membership(l, r, path),
            (Value::Map(l), Value::Map(r)) | (Value::Object(l), Value::Object(r)) => {
                self.fields(l, r, path, depth + 1);
            }
            _ => self.out.push(DiffEntry::Structural {
                path: path.to_string(),
                description: format!(
                    "kind mismatch: left='{}' right='{}'",
                    left.kind_name(),
                    right.kind_name()
                ),
            }),
        }

        if self.opts.include_identical && self.out.len() == before {
            self.out.push(DiffEntry::Identical {
                path: path.to_string(),
            });
        }
    }

    fn positional(&mut self, left: &[Value], right: &[Value], path: &str, depth: usize) {
        for i in 0..left.len().max(right.len()) {
            let child = format!("{path}.{i}");
            match (left.get(i), right.get(i)) {
                (Some(l), Some(r)) => self.value(l, r, &child, depth + 1),
                (l, r) => self.one_sided(child, l, r),
            }
        }
    }

    /// Pair set members by value. Each right member is consumed at most once.
    fn by_membership(&mut self, left: &[Value], right: &[Value], path: &str) {
        let mut unclaimed: Vec<Option<&Value>> = right.iter().map(Some).collect();

        for (i, member) in left.iter().enumerate() {
            let slot = unclaimed.iter_mut().find(|slot| **slot == Some(member));
            match slot {
                Some(slot) => {
                    *slot = None;
                    if self.opts.include_identical {
                        self.out.push(DiffEntry::Identical {
                            path: format!("{path}.{i}"),
                        });
                    }
                }
                None => self.one_sided(format!("{path}.{i}"), Some(member), None),
            }
        }

        for (i, member) in unclaimed.into_iter().enumerate() {
            if member.is_some() {
                self.one_sided(format!("{path}.{i}"), None, member);
            }
        }
    }
}
