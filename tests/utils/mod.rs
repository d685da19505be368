// Shared helpers for samplr integration tests
//
// Scripts are written under CARGO_TARGET_TMPDIR so they stay executable even
// where /tmp is mounted noexec.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fresh scratch directory inside the target directory
pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("samplr-test-")
        .tempdir_in(env!("CARGO_TARGET_TMPDIR"))
        .expect("create scratch dir")
}

/// Write a shell script with the given body and mode
pub fn write_script_with_mode(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod script");
    path
}

/// Write an executable shell script
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    write_script_with_mode(dir, name, body, 0o755)
}

/// Command for the samplr binary
pub fn samplr() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("samplr")
}

/// Run a script and return the JSON capture it produces
pub fn capture_json(script: &Path) -> serde_json::Value {
    let output = samplr()
        .arg("--json")
        .arg(script)
        .output()
        .expect("run samplr");
    assert!(
        output.status.success(),
        "samplr failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("capture is valid JSON")
}
