use std::path::PathBuf;

use pretty_assertions::assert_eq;
use value_tree_core::{parse, parse_file, write, write_file, Value};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[test]
fn written_config_parses_back_to_the_same_tree() {
    let fields = parse_file(&fixture("fixtures/config_a.json")).expect("parse config_a");

    let bytes = write(&fields).expect("write");
    assert_eq!(bytes.last(), Some(&b'\n'));
    assert_eq!(parse(&bytes).expect("re-parse"), fields);
}

#[test]
fn write_file_drops_null_members() {
    let fields = parse_file(&fixture("fixtures/config_b.json")).expect("parse config_b");
    assert!(!fields.contains_key("description"));

    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("config.json");
    write_file(&fields, &out).expect("write_file");

    let reparsed = parse_file(&out).expect("parse written file");
    assert_eq!(reparsed, fields);
    assert_eq!(reparsed.get("initial_node_count"), Some(&Value::from(3)));
}
