//! Command-line tests for the `heritage-harvester` binary.

mod common;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tokio::runtime::Runtime;
use wiremock::MockServer;

fn harvester() -> Command {
    Command::cargo_bin("heritage-harvester").unwrap()
}

#[test]
fn test_normalize_prints_field_map() {
    harvester()
        .arg("normalize")
        .arg(common::fixture_path("lido_record.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"local.HK19670603:1\""))
        .stdout(predicate::str::contains("\"Keinutuoli\""))
        .stdout(predicate::str::contains("\"creation_daterange\""));
}

#[test]
fn test_normalize_uses_source_params() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sources.yaml");
    fs::write(
        &config,
        r#"sources:
  - id: museum
    url: https://example.org/oai
    metadata_prefix: lido
    driver_params:
      online: false
"#,
    )
    .unwrap();

    harvester()
        .arg("normalize")
        .arg(common::fixture_path("lido_record.xml"))
        .arg("--config")
        .arg(&config)
        .arg("--source")
        .arg("museum")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"museum.HK19670603:1\""))
        .stdout(predicate::str::contains("online_boolean").not());
}

#[test]
fn test_normalize_missing_file_fails() {
    harvester()
        .arg("normalize")
        .arg("does-not-exist.xml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("does-not-exist.xml"));
}

#[test]
fn test_harvest_rejects_invalid_date() {
    harvester()
        .args([
            "harvest",
            "--config",
            "sources.yaml",
            "--source",
            "museum",
            "--from",
            "yesterday",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date format"));
}

#[test]
fn test_harvest_unknown_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sources.yaml");
    fs::write(&config, common::sources_yaml("https://example.org")).unwrap();

    harvester()
        .arg("harvest")
        .arg("--config")
        .arg(&config)
        .args(["--source", "archive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source: 'archive'"));
}

#[test]
fn test_harvest_writes_output_and_state() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(common::mount_two_pages(&server));

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sources.yaml");
    let state = dir.path().join("state.json");
    let output = dir.path().join("records.jsonl");
    fs::write(&config, common::sources_yaml(&server.uri())).unwrap();

    harvester()
        .arg("harvest")
        .arg("--config")
        .arg(&config)
        .args(["--source", "museum", "--until", "2024-02-01"])
        .arg("--state")
        .arg(&state)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Last harvested:"));

    let records = fs::read_to_string(&output).unwrap();
    assert_eq!(records.lines().count(), 3);
    assert!(records.contains("Pirtinpöytä"));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(saved["Last Harvest Date museum"], "2024-01-07");
}
