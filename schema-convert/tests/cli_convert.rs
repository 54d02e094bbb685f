use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("schema-convert"));
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn expand_prints_canonical_document() {
    cmd()
        .arg("expand")
        .arg("google_container_cluster")
        .arg(fixture("fixtures/cluster_config.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialClusterVersion\": \"1.29\""))
        .stdout(predicate::str::contains("\"enableL4ilbSubsetting\": true"))
        .stdout(predicate::str::contains("legacyAbac").not());
}

#[test]
fn expand_then_flatten_through_files() {
    let dir = tempdir().expect("tempdir");
    let doc = dir.path().join("cluster.doc.json");
    let back = dir.path().join("cluster.back.json");

    cmd()
        .arg("expand")
        .arg("container.googleapis.com/Cluster")
        .arg(fixture("fixtures/cluster_config.json"))
        .arg("--output")
        .arg(&doc)
        .assert()
        .success();

    cmd()
        .arg("flatten")
        .arg("google_container_cluster")
        .arg(&doc)
        .arg("--output")
        .arg(&back)
        .assert()
        .success();

    let written = fs::read_to_string(&back).expect("read flattened config");
    assert!(written.contains("\"min_master_version\": \"1.29\""));
    assert!(written.contains("\"enable_shielded_nodes\": true"));
    assert!(written.contains("\"start_time\": \"3:00\""));
}

#[test]
fn flatten_picks_asset_and_reports_unknown_fields() {
    cmd()
        .arg("flatten")
        .arg("google_container_cluster")
        .arg(fixture("fixtures/assets.json"))
        .arg("--address")
        .arg("primary")
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"warnings\""))
        .stdout(predicate::str::contains("\"path\": \"status\""))
        .stdout(predicate::str::contains("\"network_policy\""));
}

#[test]
fn flatten_text_sends_warnings_to_stderr() {
    cmd()
        .arg("flatten")
        .arg("google_container_node_pool")
        .arg(fixture("fixtures/assets.json"))
        .arg("--address")
        .arg("default-pool")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"max_pods_per_node\": 110"))
        .stderr(predicate::str::contains("unknown field status (string) ignored"));
}

#[test]
fn expand_rejects_constraint_violations() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("both_windows.json");
    fs::write(
        &config,
        r#"{
  "name": "primary",
  "maintenance_policy": [{
    "daily_maintenance_window": [{"start_time": "03:00"}],
    "recurring_window": [{"start_time": "2024-01-01T00:00:00Z", "end_time": "2024-01-01T04:00:00Z", "recurrence": "FREQ=DAILY"}]
  }]
}"#,
    )
    .expect("write config");

    cmd()
        .arg("expand")
        .arg("google_container_cluster")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("constraint violation: at most one of"));
}

#[test]
fn expand_rejects_unknown_fields_and_schemas() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("typo.json");
    fs::write(&config, r#"{"name": "primary", "nmae": "typo"}"#).expect("write config");

    cmd()
        .arg("expand")
        .arg("google_container_cluster")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nmae: no such field in schema"));

    cmd()
        .arg("expand")
        .arg("google_compute_instance")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown schema 'google_compute_instance'"));
}

#[test]
fn output_refuses_to_overwrite_input() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("cluster.json");
    fs::copy(fixture("fixtures/cluster_config.json"), &config).expect("copy fixture");

    cmd()
        .arg("expand")
        .arg("google_container_cluster")
        .arg(&config)
        .arg("--output")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("refusing to overwrite source file"));
}
