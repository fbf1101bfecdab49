//! Runs the `aq-driver` binary.

use std::process::Command;

fn driver() -> Command {
    Command::new(env!("CARGO_BIN_EXE_aq-driver"))
}

#[test]
fn test_cli_prints_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.txt");

    let output = driver()
        .args(["-p", "2", "-c", "2", "-s", "2", "-t", "1"])
        .args(["--items", "5", "--timeout-ms", "300", "--pause-ms", "1", "--seed", "7"])
        .arg("--log-file")
        .arg(&log)
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["seed"], 7);
    assert_eq!(report["inserted"], 10);
    assert_eq!(report["removed"], 10);
    assert_eq!(report["final_count"], 0);
    assert!(log.exists());
}

#[test]
fn test_cli_rejects_zero_producers() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.txt");

    let output = driver()
        .args(["-p", "0", "-c", "1", "-s", "1", "-t", "1"])
        .arg("--log-file")
        .arg(&log)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("number of producers must be greater than 0"), "{stderr}");
    assert!(stderr.contains("Usage"), "{stderr}");
    assert!(!log.exists());
}

#[test]
fn test_cli_requires_arguments() {
    let output = driver().output().unwrap();
    assert!(!output.status.success());
}
