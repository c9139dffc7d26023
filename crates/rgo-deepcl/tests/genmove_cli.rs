//! deepcl_genmove バイナリの end-to-end

#![cfg(unix)]

mod common;

use assert_cmd::prelude::*;
use common::mock_exec;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

#[test]
#[serial]
fn genmove_prints_vertex_from_mock() {
    let mut cmd = Command::cargo_bin("deepcl_genmove").expect("binary exists");
    cmd.arg("--exec")
        .arg(mock_exec())
        .args(["--side", "9", "--player", "b", "--grace-ms", "300"])
        .args(["--option", "side=9", "--option", "channels=4"]);
    cmd.assert().success().stdout(predicate::eq("A1\n"));
}

#[test]
#[serial]
fn genmove_reads_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("deepcl.toml");
    fs::write(
        &config,
        format!(
            "executable = {:?}\ngrace_period_ms = 300\n\n[options]\nside = 5\nchannels = 4\n",
            mock_exec().display().to_string()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("deepcl_genmove").expect("binary exists");
    cmd.arg("--config").arg(&config).args(["--side", "5"]);
    cmd.assert().success().stdout(predicate::eq("A1\n"));
}

#[test]
#[serial]
fn genmove_fails_when_process_dies_at_startup() {
    let mut cmd = Command::cargo_bin("deepcl_genmove").expect("binary exists");
    cmd.arg("--exec")
        .arg(mock_exec())
        .args(["--side", "9", "--grace-ms", "1500", "--option", "mode=exit"]);
    cmd.assert().failure().stderr(predicate::str::contains("died during startup"));
}

#[test]
fn genmove_requires_exec_or_config() {
    let mut cmd = Command::cargo_bin("deepcl_genmove").expect("binary exists");
    cmd.assert().failure().stderr(predicate::str::contains("either --config or --exec"));
}
