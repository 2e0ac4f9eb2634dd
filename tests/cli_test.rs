// Binary smoke tests for the operator commands

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_no_subcommand_shows_usage() {
    let mut cmd = Command::cargo_bin("voice-squads").unwrap();

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("voice-squads split"))
        .stdout(predicate::str::contains("voice-squads simulate"));
}

#[test]
fn test_split_prints_squads_and_waiting_pool() {
    let mut cmd = Command::cargo_bin("voice-squads").unwrap();

    cmd.args(["split", "--size", "4", "--seed", "7", "ana", "bo", "cy", "di", "ed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 squad(s) from 5 participant(s)"))
        .stdout(predicate::str::contains("Team A:"))
        .stdout(predicate::str::contains("Waiting:"))
        .stdout(predicate::str::contains("seed 7"));
}

#[test]
fn test_split_remainder_of_two_forms_its_own_squad() {
    let mut cmd = Command::cargo_bin("voice-squads").unwrap();

    cmd.args(["split", "-s", "3", "a", "b", "c", "d", "e", "f", "g", "h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Team C:"))
        .stdout(predicate::str::contains("Waiting:").not());
}

#[test]
fn test_split_rejects_unsupported_size() {
    let mut cmd = Command::cargo_bin("voice-squads").unwrap();

    cmd.args(["split", "--size", "1", "ana", "bo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("group size 1 is not supported"));
}

#[test]
fn test_simulate_runs_a_full_round() {
    let mut cmd = Command::cargo_bin("voice-squads").unwrap();

    cmd.args(["simulate", "--participants", "8", "--size", "4", "--seed", "3", "--drop-member"])
        .env("RUST_LOG", "warn")
        .assert()
        .success()
        .stdout(predicate::str::contains("left Team A"))
        .stdout(predicate::str::contains("🔊 The other team voted for a rematch"))
        .stdout(predicate::str::contains("Squads reset:"))
        .stdout(predicate::str::contains("7 participant(s) back in the lobby"));
}

#[test]
fn test_split_json_output_is_machine_readable() {
    let mut cmd = Command::cargo_bin("voice-squads").unwrap();

    let output = cmd
        .args(["split", "--json", "--seed", "1", "-s", "2", "ana", "bo", "cy"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["squads"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["waiting"].as_array().unwrap().len(), 1);
}
