use colored::Colorize;
use value_tree_core::{format_summary, format_text, DiffEntry};

use crate::equivalence::{EquivalenceRegistry, PredicateFactory};
use crate::flatten::UnknownFieldWarning;
use crate::harness::{BatchReport, CaseOutcome, Divergence, RoundTripReport};

/// Render diff entries for terminal output.
pub fn render_text(entries: &[DiffEntry]) -> String {
    let raw = format_text(entries);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else if line.starts_with('~') {
            line.yellow().to_string()
        } else if line.starts_with('!') {
            line.magenta().to_string()
        } else {
            line.to_string()
        };
        out.push(colored);
    }

    out.join("\n")
}

/// Render summary counts for terminal output.
pub fn render_summary(entries: &[DiffEntry]) -> String {
    format_summary(entries).cyan().to_string()
}

/// Render schema-drift warnings, one per line.
pub fn render_warnings(warnings: &[UnknownFieldWarning]) -> String {
    warnings
        .iter()
        .map(|w| format!("! {w}").magenta().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render export divergences, one path per line.
pub fn render_divergences(divergences: &[Divergence]) -> String {
    let mut out = Vec::new();
    for divergence in divergences {
        match divergence {
            Divergence::Missing { path, raw } => {
                out.push(format!("- {path} = {raw}").red().to_string());
            }
            Divergence::NotEquivalent {
                path,
                raw,
                exported,
            } => {
                out.push(format!("~ {path}").yellow().to_string());
                out.push(format!("  raw:      {raw}"));
                out.push(format!("  exported: {exported}"));
            }
        }
    }
    out.join("\n")
}

/// Render one round-trip report.
pub fn render_round_trip(report: &RoundTripReport) -> String {
    let mut out = Vec::new();
    let address = report.address.as_deref().unwrap_or("<unnamed>");
    let verdict = if report.passed() {
        "PASS".green().bold().to_string()
    } else {
        "FAIL".red().bold().to_string()
    };
    out.push(format!("{verdict} {address}"));

    if !report.divergences.is_empty() {
        out.push("export_fidelity".to_string());
        out.push(render_divergences(&report.divergences));
    }
    if !report.stability_diff.is_empty() {
        out.push("stability".to_string());
        out.push(render_text(&report.stability_diff));
    }
    if !report.warnings.is_empty() {
        out.push("warnings".to_string());
        out.push(render_warnings(&report.warnings));
    }
    out.push(
        format!(
            "divergences={} stability_diffs={} warnings={}",
            report.divergences.len(),
            report.stability_diff.len(),
            report.warnings.len()
        )
        .cyan()
        .to_string(),
    );
    out.join("\n")
}

/// Render a batch, one line per case plus the details of failures.
pub fn render_batch(report: &BatchReport) -> String {
    let mut out = Vec::new();
    for result in &report.results {
        match &result.outcome {
            CaseOutcome::Completed { report: case } if case.passed() => {
                out.push(format!("{} {} ({})", "PASS".green(), result.label, result.schema));
            }
            CaseOutcome::Completed { report: case } => {
                out.push(format!("{} {} ({})", "FAIL".red(), result.label, result.schema));
                for path in case.missing_fields() {
                    out.push(format!("  export: {path}"));
                }
                for path in case.stability_paths() {
                    out.push(format!("  stability: {path}"));
                }
            }
            CaseOutcome::Failed { error } => {
                out.push(format!("{} {} ({})", "ERROR".magenta(), result.label, result.schema));
                out.push(format!("  {error}"));
            }
        }
    }
    out.push(
        format!(
            "cases={} passed={} failed={}",
            report.results.len(),
            report.passed(),
            report.failed()
        )
        .cyan()
        .to_string(),
    );
    out.join("\n")
}

/// Render registered predicate families.
pub fn render_families(families: &[&PredicateFactory]) -> String {
    let width = families.iter().map(|f| f.family.len()).max().unwrap_or(0);
    families
        .iter()
        .map(|f| format!("{:width$}  {}", f.family, f.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the bound patterns of one registry.
pub fn render_bindings(registry: &EquivalenceRegistry) -> String {
    registry
        .entries()
        .map(|(pattern, name)| format!("- {} -> {name}", pattern.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use value_tree_core::{DiffEntry, Value};

    use super::{render_batch, render_divergences, render_text};
    use crate::harness::{BatchReport, CaseOutcome, CaseResult, Divergence};

    #[test]
    fn text_keeps_every_entry_line() {
        colored::control::set_override(false);
        let entries = vec![
            DiffEntry::OnlyLeft {
                path: "a".into(),
                value: Value::from(1),
            },
            DiffEntry::OnlyRight {
                path: "b".into(),
                value: Value::from(2),
            },
        ];
        let out = render_text(&entries);
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("- a = 1"));
        assert!(out.contains("+ b = 2"));
    }

    #[test]
    fn divergences_show_both_sides() {
        colored::control::set_override(false);
        let out = render_divergences(&[Divergence::NotEquivalent {
            path: "name".into(),
            raw: Value::from("a"),
            exported: Value::from("b"),
        }]);
        assert!(out.contains("~ name"));
        assert!(out.contains("raw:      \"a\""));
        assert!(out.contains("exported: \"b\""));
    }

    #[test]
    fn batch_lists_errors_and_counts() {
        colored::control::set_override(false);
        let report = BatchReport {
            results: vec![CaseResult {
                label: "broken".into(),
                schema: "nope".into(),
                outcome: CaseOutcome::Failed {
                    error: "unknown resource schema: nope".into(),
                },
            }],
        };
        let out = render_batch(&report);
        assert!(out.contains("ERROR broken (nope)"));
        assert!(out.contains("cases=1 passed=0 failed=1"));
    }
}
