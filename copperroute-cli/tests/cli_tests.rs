//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// Build command for the copperroute-cli binary (finds it in target/debug when run via cargo test).
fn copperroute_cli() -> Command {
    cargo_bin_cmd!("copperroute-cli")
}

/// Path to copperroute library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("copperroute")
        .join("tests")
        .join("fixtures")
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_help() {
    let mut cmd = copperroute_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("routing"));
}

#[test]
fn test_cli_version() {
    let mut cmd = copperroute_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_replay_human() {
    let mut cmd = copperroute_cli();
    let fixtures = fixtures_dir();

    cmd.arg("replay")
        .arg(fixtures.join("two_nets.json"))
        .arg(fixtures.join("merge_then_blocked.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("finished"))
        .stdout(predicate::str::contains("REFUSED"))
        .stdout(predicate::str::contains("Merges:    1"));
}

#[test]
fn test_cli_replay_json() {
    let mut cmd = copperroute_cli();
    let fixtures = fixtures_dir();

    cmd.arg("replay")
        .arg(fixtures.join("two_nets.json"))
        .arg(fixtures.join("merge_then_blocked.json"))
        .arg("--format")
        .arg("json");

    let report = json_stdout(&mut cmd);
    assert_eq!(report["summary"]["merges"], 1);
    assert_eq!(report["summary"]["refused"], 1);
    assert_eq!(report["steps"].as_array().map(|s| s.len()), Some(6));
    assert_eq!(report["steps"][2]["outcome"]["outcome"], "finished");
}

#[test]
fn test_cli_replay_fail_on_refused() {
    let mut cmd = copperroute_cli();
    let fixtures = fixtures_dir();

    cmd.arg("replay")
        .arg(fixtures.join("two_nets.json"))
        .arg(fixtures.join("merge_then_blocked.json"))
        .arg("--fail-on-refused");

    cmd.assert().code(1);
}

#[test]
fn test_cli_replay_writes_board() {
    let out = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    let mut cmd = copperroute_cli();
    let fixtures = fixtures_dir();

    cmd.arg("replay")
        .arg(fixtures.join("two_nets.json"))
        .arg(fixtures.join("merge_then_blocked.json"))
        .arg("--output")
        .arg(out.path());
    cmd.assert().success();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path()).unwrap()).unwrap();
    assert_eq!(written["tracks"].as_array().map(|t| t.len()), Some(2));
    assert_eq!(written["nets"].as_array().map(|n| n.len()), Some(2));

    // The written board loads and checks clean.
    let mut check = copperroute_cli();
    check.arg("check").arg(out.path());
    check.assert().success();
}

#[test]
fn test_cli_replay_with_config() {
    let mut cmd = copperroute_cli();
    let fixtures = fixtures_dir();

    cmd.arg("replay")
        .arg(fixtures.join("two_nets.json"))
        .arg(fixtures.join("free_legs.json"))
        .arg("--config")
        .arg(fixtures.join("wide_tracks.json"))
        .arg("--format")
        .arg("json");

    let report = json_stdout(&mut cmd);
    assert_eq!(report["summary"]["vias"], 1);
    assert_eq!(report["summary"]["canceled"], 1);
}

#[test]
fn test_cli_replay_bad_config() {
    let mut cmd = copperroute_cli();
    let fixtures = fixtures_dir();

    cmd.arg("replay")
        .arg(fixtures.join("two_nets.json"))
        .arg(fixtures.join("free_legs.json"))
        .arg("--config")
        .arg(fixtures.join("bad_config.json"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("track_width"));
}

#[test]
fn test_cli_obstacles_json() {
    let mut cmd = copperroute_cli();
    let path = fixtures_dir().join("sample.kicad_pcb");

    cmd.arg("obstacles")
        .arg(path)
        .arg("--layer")
        .arg("F.Cu")
        .arg("--net")
        .arg("SDA")
        .arg("--format")
        .arg("json");

    let summary = json_stdout(&mut cmd);
    assert_eq!(summary["count"], 4);
    assert_eq!(summary["by_kind"]["keepout"], 1);
}

#[test]
fn test_cli_obstacles_unknown_layer() {
    let mut cmd = copperroute_cli();
    let path = fixtures_dir().join("sample.kicad_pcb");

    cmd.arg("obstacles").arg(path).arg("--layer").arg("In9.Cu");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown layer"));
}

#[test]
fn test_cli_check_clean_board() {
    let mut cmd = copperroute_cli();
    let path = fixtures_dir().join("two_nets.json");

    cmd.arg("check").arg(path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn test_cli_check_dangling_track() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{
            "name": "broken",
            "nets": [{{ "id": 1, "name": "SIG" }}],
            "tracks": [{{
                "id": "0b7e2c4a-0000-4000-8000-000000000001",
                "from": {{ "kind": "junction", "id": "0b7e2c4a-0000-4000-8000-000000000002" }},
                "to": {{ "kind": "junction", "id": "0b7e2c4a-0000-4000-8000-000000000003" }},
                "net": 1,
                "layer": 0,
                "width": 250000
            }}]
        }}"#
    )
    .unwrap();

    let mut cmd = copperroute_cli();
    cmd.arg("check").arg(file.path()).arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["issues"][0]["issue"], "dangling_terminal");
}

#[test]
fn test_cli_layers_from_board() {
    let mut cmd = copperroute_cli();
    let path = fixtures_dir().join("sample.kicad_pcb");

    cmd.arg("layers").arg(path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("In2.Cu"))
        .stdout(predicate::str::contains("B.Cu"));
}

#[test]
fn test_cli_layers_default() {
    let mut cmd = copperroute_cli();

    cmd.arg("layers");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("F.Cu"))
        .stdout(predicate::str::contains("In1.Cu").not());
}

#[test]
fn test_cli_missing_file() {
    let mut cmd = copperroute_cli();

    cmd.arg("check").arg("nonexistent.kicad_pcb");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_cli_unsupported_extension() {
    let mut cmd = copperroute_cli();

    cmd.arg("check").arg("board.brd");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported board format"));
}
