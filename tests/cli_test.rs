//! End-to-end tests for the `rulestore` binary.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn rulestore(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rulestore").expect("binary should build");
    cmd.env_remove("RULESTORE_DB")
        .env_remove("RULESTORE_TABLE")
        .env_remove("RULESTORE_LOG")
        .arg("--db-path")
        .arg(db);
    cmd
}

#[test]
fn test_init_and_status() {
    let temp = TempDir::new().expect("temp dir");
    let db = temp.path().join("policy.db");

    rulestore(&db)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized policy table casbin_rule"));

    rulestore(&db)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rules:     0"));
}

#[test]
fn test_init_and_export_json() {
    let temp = TempDir::new().expect("temp dir");
    let db = temp.path().join("policy.db");

    rulestore(&db)
        .args(["--format", "json", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"table\": \"casbin_rule\""));

    rulestore(&db)
        .args(["add", "g", "alice", "admin"])
        .assert()
        .success();

    let output = rulestore(&db)
        .args(["--format", "json", "export"])
        .output()
        .expect("run export");
    assert!(output.status.success());
    let lines: Vec<String> = serde_json::from_slice(&output.stdout).expect("export is JSON");
    assert_eq!(lines, vec!["g, alice, admin"]);
}

#[test]
fn test_add_list_remove() {
    let temp = TempDir::new().expect("temp dir");
    let db = temp.path().join("policy.db");

    rulestore(&db)
        .args(["add", "p", "alice", "data1", "read"])
        .assert()
        .success()
        .stdout("Added 1 rule.\n");
    rulestore(&db)
        .args(["add", "g", "alice", "admin"])
        .assert()
        .success();

    rulestore(&db)
        .arg("list")
        .assert()
        .success()
        .stdout("g, alice, admin\np, alice, data1, read\n");

    rulestore(&db)
        .args(["list", "--filter", r#"{"g": [["alice"]]}"#])
        .assert()
        .success()
        .stdout("g, alice, admin\n");

    rulestore(&db)
        .args(["remove", "p", "alice", "data1", "read"])
        .assert()
        .success()
        .stdout("Removed 1 rule.\n");
}

#[test]
fn test_remove_filtered() {
    let temp = TempDir::new().expect("temp dir");
    let db = temp.path().join("policy.db");

    rulestore(&db)
        .args(["add", "p", "alice", "data1", "read"])
        .assert()
        .success();
    rulestore(&db)
        .args(["add", "p", "bob", "data1", "write"])
        .assert()
        .success();

    rulestore(&db)
        .args(["remove-filtered", "p", "1", "data1"])
        .assert()
        .success()
        .stdout("Removed 2 rules.\n");

    rulestore(&db)
        .args(["remove-filtered", "p", "5", "a", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("field index 5"));
}

#[test]
fn test_import_export() {
    let temp = TempDir::new().expect("temp dir");
    let db = temp.path().join("policy.db");
    let policy = temp.path().join("policy.csv");
    let exported = temp.path().join("exported.csv");

    std::fs::write(
        &policy,
        "# sample policy\np, alice, data1, read\np, bob, data2, write\n\ng, alice, admin\n",
    )
    .expect("write policy file");

    rulestore(&db)
        .arg("import")
        .arg(&policy)
        .assert()
        .success()
        .stdout("Imported 3 rules.\n");

    rulestore(&db)
        .args(["export", "--output"])
        .arg(&exported)
        .assert()
        .success();

    let body = std::fs::read_to_string(&exported).expect("read export");
    assert_eq!(
        body,
        "p, alice, data1, read\np, bob, data2, write\ng, alice, admin\n"
    );
}

#[test]
fn test_json_error_output() {
    let temp = TempDir::new().expect("temp dir");
    let db = temp.path().join("policy.db");

    rulestore(&db)
        .args(["--format", "json", "add", "p", "a", "b", "c", "d", "e", "f", "g"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"error\""));
}

#[test]
fn test_invalid_table_name() {
    let temp = TempDir::new().expect("temp dir");
    let db = temp.path().join("policy.db");

    rulestore(&db)
        .args(["--table", "bad name", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid table name"));
}
