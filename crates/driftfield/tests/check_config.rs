use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn check_reports_resolved_configuration() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("field.toml");
    fs::write(
        &config_path,
        r##"
version = 1

[effect]
force = 0.8
color_levels = 8

[palette]
stops = ["#102030", "#405060", "#f2f5f7"]

[autopilot]
takeover = "250ms"
resume_delay = "3s"
"##,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_driftfield"))
        .arg("--config")
        .arg(&config_path)
        .arg("check")
        .output()
        .expect("failed to run driftfield check");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("force=0.80"), "stdout was: {stdout}");
    assert!(stdout.contains("3 stops"));
    assert!(stdout.contains("takeover=250ms"));
}

#[test]
fn check_rejects_invalid_configuration() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("field.toml");
    fs::write(
        &config_path,
        r#"
version = 1

[surface]
resolution_scale = 2.5
"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_driftfield"))
        .arg("--config")
        .arg(&config_path)
        .arg("check")
        .output()
        .expect("failed to run driftfield check");

    assert!(!output.status.success());
}

#[test]
fn check_runs_without_a_config_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_driftfield"))
        .arg("check")
        .output()
        .expect("failed to run driftfield check");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Resolved configuration"));
    assert!(stdout.contains("fps=uncapped"));
}
