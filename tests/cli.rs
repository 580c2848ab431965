//! CLI test cases.
//!
//! None of these talk to Azure, except the ignored ones at the bottom, which
//! need real credentials and a PDF named by `DOCINTEL_TEST_PDF`.

use std::{io::Write as _, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::NamedTempFile;

const ENDPOINT_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT";
const KEY_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_KEY";

/// Create a new `Command` with our binary.
fn cmd() -> Command {
    Command::cargo_bin("docintel-gateway").unwrap()
}

/// A command with no usable Azure credentials.
///
/// We set the variables to empty strings rather than removing them, because
/// `.env` never overrides a variable that's already set, and we treat empty
/// values as missing.
fn cmd_without_credentials() -> Command {
    let mut cmd = cmd();
    cmd.env(ENDPOINT_VAR, "").env(KEY_VAR, "");
    cmd
}

/// A tiny file that looks like a PDF. We never get far enough to send it.
fn fake_pdf() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    file.write_all(b"%PDF-1.4\n%%EOF\n").unwrap();
    file
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(ENDPOINT_VAR));
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_schema_coords_output() {
    cmd()
        .arg("schema")
        .arg("CoordsOutput")
        .assert()
        .success()
        .stdout(predicate::str::contains("line_index"))
        .stdout(predicate::str::contains("word_index"));
}

#[test]
fn test_schema_full_output_to_file() {
    let out = NamedTempFile::new().unwrap();
    cmd()
        .arg("schema")
        .arg("FullOutput")
        .arg("-o")
        .arg(out.path())
        .assert()
        .success();
    let schema = std::fs::read_to_string(out.path()).unwrap();
    assert!(schema.contains("key_value_pairs"));
}

#[test]
fn test_schema_rejects_unknown_type() {
    cmd().arg("schema").arg("Nope").assert().failure();
}

#[test]
fn test_coords_missing_file() {
    cmd_without_credentials()
        .arg("coords")
        .arg("does-not-exist.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_coords_missing_credentials() {
    let pdf = fake_pdf();
    cmd_without_credentials()
        .arg("coords")
        .arg(pdf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials not found"))
        .stderr(predicate::str::contains(KEY_VAR));
}

#[test]
fn test_dotenv_does_not_override_empty_credentials() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        format!("{ENDPOINT_VAR}=http://127.0.0.1:9/\n{KEY_VAR}=from-dotenv\n"),
    )
    .unwrap();
    let pdf = fake_pdf();
    cmd_without_credentials()
        .current_dir(dir.path())
        .arg("coords")
        .arg(pdf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials not found"));
}

#[test]
fn test_extract_missing_credentials() {
    let pdf = fake_pdf();
    cmd_without_credentials()
        .arg("extract")
        .arg(pdf.path())
        .arg("--model")
        .arg("prebuilt-invoice")
        .assert()
        .failure()
        .stderr(predicate::str::contains("credentials not found"));
}

#[test]
fn test_extract_rejects_unknown_model() {
    let pdf = fake_pdf();
    cmd_without_credentials()
        .arg("extract")
        .arg(pdf.path())
        .arg("--model")
        .arg("prebuilt-nope")
        .assert()
        .failure();
}

#[test]
fn test_out_requires_json() {
    let pdf = fake_pdf();
    cmd_without_credentials()
        .arg("coords")
        .arg(pdf.path())
        .arg("-o")
        .arg("out.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--json"));
}

#[test]
#[ignore = "Needs Azure credentials and DOCINTEL_TEST_PDF"]
fn test_coords_json_live() {
    let pdf = std::env::var("DOCINTEL_TEST_PDF").unwrap();
    cmd()
        .arg("coords")
        .arg(pdf)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lines\""));
}

#[test]
#[ignore = "Needs Azure credentials and DOCINTEL_TEST_PDF"]
fn test_extract_live() {
    let pdf = std::env::var("DOCINTEL_TEST_PDF").unwrap();
    cmd()
        .arg("extract")
        .arg(pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("Analysis complete!"));
}
