use crate::diff::result::DiffEntry;

/// Format diff entries as plain text.
///
/// One line per entry, prefixed `=` identical, `~` modified, `-` left only,
/// `+` right only and `!` structural.
pub fn format_text(entries: &[DiffEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    for entry in entries {
        match entry {
            DiffEntry::Identical { path } => lines.push(format!("= {path}")),
            DiffEntry::Modified { path, left, right } => {
                lines.push(format!("~ {path}"));
                lines.push(format!("  left:  {left}"));
                lines.push(format!("  right: {right}"));
            }
            DiffEntry::OnlyLeft { path, value } => lines.push(format!("- {path} = {value}")),
            DiffEntry::OnlyRight { path, value } => lines.push(format!("+ {path} = {value}")),
            DiffEntry::Structural { path, description } => {
                lines.push(format!("! {path}: {description}"));
            }
        }
    }
    lines.join("\n")
}

/// Format a simple summary of diff counts.
pub fn format_summary(entries: &[DiffEntry]) -> String {
    let mut identical = 0;
    let mut modified = 0;
    let mut only_left = 0;
    let mut only_right = 0;
    let mut structural = 0;

    for entry in entries {
        match entry {
            DiffEntry::Identical { .. } => identical += 1,
            DiffEntry::Modified { .. } => modified += 1,
            DiffEntry::OnlyLeft { .. } => only_left += 1,
            DiffEntry::OnlyRight { .. } => only_right += 1,
            DiffEntry::Structural { .. } => structural += 1,
        }
    }

    format!(
        "identical={identical} modified={modified} only_left={only_left} only_right={only_right} structural={structural}"
    )
}

#[cfg(test)]
mod tests {
    use super::{format_summary, format_text};
    use crate::{DiffEntry, Value};

    #[test]
    fn text_output_includes_values_for_one_sided_entries() {
        let entries = vec![
            DiffEntry::OnlyLeft {
                path: "node_config.0.machine_type".into(),
                value: Value::from("e2-medium"),
            },
            DiffEntry::Modified {
                path: "location".into(),
                left: "\"us-central1\"".into(),
                right: "\"us-east1\"".into(),
            },
        ];
        let text = format_text(&entries);
        assert!(text.contains("- node_config.0.machine_type = \"e2-medium\""));
        assert!(text.contains("~ location"));
        assert_eq!(
            format_summary(&entries),
            "identical=0 modified=1 only_left=1 only_right=0 structural=0"
        );
    }
}
