//! Integration tests for invocation modes and usage handling

mod utils;

use predicates::prelude::*;
use utils::{samplr, scratch_dir, write_script};

#[test]
fn test_no_arguments_prints_usage_and_exits_2() {
    samplr()
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_options_without_input_print_usage_and_succeed() {
    samplr()
        .arg("--html")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_outfile_without_input_does_no_work() {
    let dir = scratch_dir();
    let out = dir.path().join("report.txt");

    samplr().arg("-o").arg(&out).assert().success();
    assert!(!out.exists(), "no report should be written without input");
}

#[test]
fn test_help_flag() {
    samplr()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--infile"))
        .stdout(predicate::str::contains("--outfile"))
        .stdout(predicate::str::contains("--html"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_html_and_json_are_mutually_exclusive() {
    samplr()
        .args(["--html", "--json", "-i", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_invalid_interval_rejected() {
    samplr()
        .args(["--interval", "0", "-i", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval"));
}

#[test]
fn test_oversized_interval_is_a_usage_error() {
    samplr()
        .args(["--interval", "1e30", "-i", "-"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid interval 1e30"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_script_takes_precedence_over_infile() {
    let dir = scratch_dir();
    let script = write_script(dir.path(), "job.sh", "exit 0");

    // The infile does not exist; it must be ignored because a script is given.
    samplr()
        .arg("--json")
        .arg("-i")
        .arg(dir.path().join("missing.json"))
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"program\": \"job.sh\""));
}

#[test]
fn test_arguments_after_script_are_passed_through() {
    let dir = scratch_dir();
    let marker = dir.path().join("args.txt");
    let script = write_script(
        dir.path(),
        "job.sh",
        &format!("printf '%s\\n' \"$@\" > '{}'", marker.display()),
    );

    samplr()
        .arg("-o")
        .arg(dir.path().join("report.txt"))
        .arg(&script)
        .args(["--json", "-o", "x"])
        .assert()
        .success();

    let args = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(args, "--json\n-o\nx\n");
}
