//! End-to-end CLI integration tests.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn xalloc_bench() -> Command {
    let mut cmd = Command::cargo_bin("xalloc-bench").expect("binary not found");
    for var in [
        "XALLOC_ITERATIONS",
        "XALLOC_RUNS",
        "XALLOC_BLOCK_SIZES",
        "XALLOC_MODE",
        "XALLOC_MAX_BLOCKS",
        "XALLOC_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_flag() {
    xalloc_bench()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fixed-block"));
}

#[test]
fn version_flag() {
    xalloc_bench()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("xalloc-bench"));
}

#[test]
fn all_workloads_report_runs_and_stats() {
    xalloc_bench()
        .args(["-n", "200", "-r", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list system heap (Run 1)"))
        .stdout(predicate::str::contains("map fixed block (Run 2)"))
        .stdout(predicate::str::contains("string fixed block (Run 1)"))
        .stdout(predicate::str::contains("Allocator statistics (heap-blocks)"));
}

#[test]
fn quiet_skips_stats() {
    xalloc_bench()
        .args(["-n", "50", "-r", "1", "--workload", "list", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Allocator statistics").not());
}

#[test]
fn json_output() {
    let output = xalloc_bench()
        .args(["-n", "100", "-r", "1", "--workload", "map", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["iterations"], 100);
    assert_eq!(json["runs"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["comparisons"][0]["workload"], "map");
    assert_eq!(json["stats"]["mode"], "heap-blocks");
}

#[test]
fn static_mode_from_env() {
    xalloc_bench()
        .args(["-n", "100", "-r", "1", "--workload", "list"])
        .env("XALLOC_MODE", "static")
        .env("XALLOC_MAX_BLOCKS", "128")
        .assert()
        .success()
        .stdout(predicate::str::contains("static-pools"));
}

#[test]
fn static_exhaustion_exits_with_oom_code() {
    xalloc_bench()
        .args([
            "-n",
            "100",
            "-r",
            "1",
            "--workload",
            "list",
            "--mode",
            "static",
            "--max-blocks",
            "10",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("out of memory"));
}

#[test]
fn spill_survives_exhaustion() {
    xalloc_bench()
        .args([
            "-n",
            "100",
            "-r",
            "1",
            "--workload",
            "list",
            "--mode",
            "static",
            "--max-blocks",
            "10",
            "--spill",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("exhaustions: 90"));
}

#[test]
fn config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"block_sizes":[32,64,256]}}"#).unwrap();
    xalloc_bench()
        .args(["-n", "50", "-r", "1", "--workload", "string", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("string fixed block (Run 1)"));
}

#[test]
fn invalid_workload() {
    xalloc_bench()
        .args(["--workload", "deque"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("unknown workload"));
}

#[test]
fn invalid_block_sizes() {
    xalloc_bench()
        .args(["--sizes", "0,16"])
        .assert()
        .code(4);
}
