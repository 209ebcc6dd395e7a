use std::process::{Command, Output};

fn team_tasking(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_team-tasking"))
        .current_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to launch the team-tasking binary")
}

#[test]
fn kickoff_scenario_prints_one_line_per_cycle() {
    let output = team_tasking(&["run", "--scenario", "kickoff.toml"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 57);
    assert!(lines[0].starts_with("cycle=0 t=0ms phase=Initial role=None cell=-"));
    assert!(lines[2].contains("phase=Ready role=Leader"), "{}", lines[2]);
    assert!(lines.iter().any(|line| line.contains("phase=Playing")));
    assert!(lines[56].contains("role=None"), "{}", lines[56]);
}

#[test]
fn static_configuration_can_replace_the_scenario_default() {
    let output = team_tasking(&["run", "--scenario", "kickoff.toml", "--config", "static.toml"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let ready = stdout
        .lines()
        .find(|line| line.contains("phase=Ready"))
        .expect("the scenario contains a ready phase");
    assert!(ready.contains("cell=2"), "{ready}");
}

#[test]
fn missing_scenario_fails_with_the_path_in_the_error() {
    let output = team_tasking(&["run", "--scenario", "does-not-exist.toml"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read scenario at does-not-exist.toml"), "{stderr}");
}

#[test]
fn invalid_log_filters_are_rejected() {
    let output = team_tasking(&["--log-level", "team_tasking=loud", "run", "--scenario", "kickoff.toml"]);
    assert!(!output.status.success());
}
