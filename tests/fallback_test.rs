use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn health_request() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"op": "health"}}"#).unwrap();
    file
}

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let input = health_request();
    let dir = tempfile::tempdir().unwrap();

    Command::new(cargo_bin!("cakehouse"))
        .arg("process")
        .arg(input.path())
        .arg("--db-path")
        .arg(dir.path().join("bakery_db"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\":true"))
        .stderr(predicate::str::contains("falling back to in-memory storage"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let input = health_request();
    let dir = tempfile::tempdir().unwrap();

    Command::new(cargo_bin!("cakehouse"))
        .arg("process")
        .arg(input.path())
        .arg("--db-path")
        .arg(dir.path().join("bakery_db"))
        .assert()
        .success()
        .stderr(predicate::str::contains("falling back").not());
}
