use crate::schema::{AbsentPolicy, FieldDescriptor, FieldKind, ResourceSchema};

/// Render a schema's descriptor tree with a configurable max depth.
pub fn render_schema(schema: &ResourceSchema, max_depth: usize) -> String {
    let mut out = format!("{} ({})\n", schema.name, schema.asset_type);
    for field in schema.fields() {
        render_field(field, 1, max_depth, &mut out);
    }
    for group in &schema.constraint_groups {
        out.push_str(&format!("constraint: {} [{}]\n", group.kind, group.fields.join(", ")));
    }
    out
}

fn render_field(fd: &FieldDescriptor, depth: usize, max_depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let kind = if fd.single_block {
        "block".to_string()
    } else {
        fd.kind.label()
    };
    out.push_str(&format!("{indent}{}: {kind} -> {}", fd.name, fd.wire_display()));
    for flag in flags(fd) {
        out.push(' ');
        out.push_str(&flag);
    }
    out.push('\n');

    if depth >= max_depth {
        return;
    }
    if let Some(children) = fd.object_children() {
        for child in children {
            render_field(child, depth + 1, max_depth, out);
        }
    }
}

fn flags(fd: &FieldDescriptor) -> Vec<String> {
    let mut flags = Vec::new();
    if fd.required {
        flags.push("required".to_string());
    }
    if fd.computed {
        flags.push("computed".to_string());
    }
    if let Some(default) = &fd.default {
        flags.push(format!("default={default}"));
    }
    if let Some(reference) = &fd.equivalence {
        flags.push(format!("equivalence={reference}"));
    }
    if let Some(max) = fd.max_items.filter(|_| !fd.single_block) {
        flags.push(format!("max_items={max}"));
    }
    if fd.absent == AbsentPolicy::EmitEmpty {
        flags.push("emit_empty".to_string());
    }
    if fd.omit_zero {
        flags.push("omit_zero".to_string());
    }
    if fd.synthesize_when_absent {
        flags.push("synthesize".to_string());
    }
    if fd.int_as_string && matches!(fd.kind, FieldKind::Scalar(_)) {
        flags.push("int_as_string".to_string());
    }
    flags
}
