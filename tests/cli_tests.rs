//! Command-line tests running the `seq-dbi` binary.

mod common;

use assert_cmd::Command;
use common::{Index, DIVISION_A, DIVISION_B, RELEASE_DATE};
use predicates::prelude::*;
use tempfile::TempDir;

fn seq_dbi() -> Command {
    Command::cargo_bin("seq-dbi").unwrap()
}

fn sources(tmp: &TempDir) -> std::path::PathBuf {
    let src = tmp.path().join("src");
    std::fs::create_dir(&src).unwrap();
    std::fs::write(src.join("a.dat"), DIVISION_A).unwrap();
    std::fs::write(src.join("b.dat"), DIVISION_B).unwrap();
    src
}

#[test]
fn test_help_lists_commands() {
    seq_dbi()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("flat"))
        .stdout(predicate::str::contains("fasta"))
        .stdout(predicate::str::contains("blast"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_flat_command() {
    let tmp = TempDir::new().unwrap();
    let src = sources(&tmp);
    let index = tmp.path().join("index");

    seq_dbi()
        .arg("flat")
        .arg(&src)
        .args(["--db-name", "embl", "--wildcard", "*.dat", "--date", RELEASE_DATE])
        .arg("--index-dir")
        .arg(&index)
        .assert()
        .success()
        .stdout(predicate::str::contains("Index: embl"))
        .stdout(predicate::str::contains("Identifiers: 4"))
        .stdout(predicate::str::contains("Duplicates dropped: 1"));

    let index = Index::read(&index);
    assert_eq!(index.entries.len(), 4);
    assert_eq!(index.headers[0].db_name, "embl");
}

#[test]
fn test_json_output() {
    let tmp = TempDir::new().unwrap();
    let src = sources(&tmp);
    let index = tmp.path().join("index");

    let output = seq_dbi()
        .args(["--format", "json", "flat"])
        .arg(&src)
        .args(["--db-name", "embl", "--wildcard", "*.dat", "--sort-mode", "external"])
        .arg("--index-dir")
        .arg(&index)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["db_name"], "embl");
    assert_eq!(json["sort_mode"], "external");
    assert_eq!(json["entries"], 4);
    assert_eq!(json["distinct_accessions"], 5);
    assert_eq!(json["files"][0], "a.dat");
}

#[test]
fn test_fasta_command_with_convention() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir(&src).unwrap();
    std::fs::write(src.join("est.fa"), ">est1 x12345 first\nACGT\n>est2 none\nACGT\n").unwrap();
    let index = tmp.path().join("index");

    seq_dbi()
        .arg("fasta")
        .arg(&src)
        .args(["--db-name", "est", "--convention", "gcg"])
        .arg("--index-dir")
        .arg(&index)
        .assert()
        .success();

    let index = Index::read(&index);
    assert_eq!(index.lookup("X12345"), vec!["est1"]);
    assert_eq!(index.targets.len(), 1);
}

#[test]
fn test_missing_sources_fail() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("empty");
    std::fs::create_dir(&src).unwrap();

    seq_dbi()
        .arg("flat")
        .arg(&src)
        .args(["--db-name", "embl"])
        .arg("--index-dir")
        .arg(tmp.path().join("index"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_db_name_too_long_fails() {
    let tmp = TempDir::new().unwrap();
    let src = sources(&tmp);

    seq_dbi()
        .arg("flat")
        .arg(&src)
        .args(["--db-name", "a_database_name_that_is_too_long"])
        .arg("--index-dir")
        .arg(tmp.path().join("index"))
        .assert()
        .failure();
    assert!(!tmp.path().join("index").exists());
}

#[test]
fn test_missing_db_name_is_usage_error() {
    seq_dbi()
        .args(["flat", "/tmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--db-name"));
}

#[test]
fn test_run_with_config_file() {
    let tmp = TempDir::new().unwrap();
    let src = sources(&tmp);
    let index = tmp.path().join("index");

    let config = serde_json::json!({
        "directory": src,
        "index_dir": index,
        "format": "embl",
        "db_name": "fromfile",
        "wildcard": "*.dat",
        "release": "7",
        "date": RELEASE_DATE,
        "byte_order": "big",
    });
    let config_path = tmp.path().join("index.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    seq_dbi()
        .args(["run", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Index: fromfile (release '7')"));

    let index = Index::read_with(&index, true);
    assert_eq!(index.headers[1].release, "7");
    assert_eq!(index.entries.len(), 4);
}
