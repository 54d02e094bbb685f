use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Refuse an output path that resolves to one of the inputs.
pub fn ensure_output_not_same(output: &Path, inputs: &[&Path]) -> Result<()> {
    let target = comparable(output)
        .with_context(|| format!("failed to resolve output path {}", output.display()))?;

    for input in inputs {
        let source = comparable(input)
            .with_context(|| format!("failed to resolve input path {}", input.display()))?;
        if target == source {
            bail!(
                "refusing to overwrite source file: output {} matches input {}",
                output.display(),
                input.display()
            );
        }
    }
    Ok(())
}

/// Canonical form of `path`. A file that does not exist yet is resolved
/// through its nearest existing ancestor.
fn comparable(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().context("current_dir")?.join(path)
    };
    let absolute = lexical(&absolute);

    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }

    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("canonicalize {}", existing.display()))?;
    resolved.extend(tail.iter().rev());
    Ok(resolved)
}

/// Drop `.` and fold `..` without touching the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
