use std::process::Command;

fn fixture_path() -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    format!("{manifest_dir}/tests/fixtures/sample-python-project/")
}

fn mainseq_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mainseq"))
}

#[test]
fn test_analyze_sample_project() {
    let output = mainseq_cmd()
        .args(["analyze", &fixture_path()])
        .output()
        .expect("failed to run mainseq analyze");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "mainseq analyze failed: stdout={stdout}, stderr={stderr}"
    );
    assert!(
        stdout.contains("Average distance"),
        "should contain the average: {stdout}"
    );
    assert!(
        stdout.contains("app.base"),
        "should list the abstract module: {stdout}"
    );
    assert!(
        stdout.contains("app.cycle_a -> app.cycle_b -> app.cycle_a"),
        "should report the cycle walk: {stdout}"
    );
}

#[test]
fn test_check_sample_project_fails_on_threshold() {
    // app.base sits at D=1.0, far beyond the default 0.1 threshold
    let output = mainseq_cmd()
        .args(["check", &fixture_path()])
        .output()
        .expect("failed to run mainseq check");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        output.status.code(),
        Some(1),
        "expected exit code 1 for offenders, got {:?}: {stdout}",
        output.status.code()
    );
    assert!(
        stdout.contains("CHECK FAILED"),
        "should say CHECK FAILED: {stdout}"
    );
}

#[test]
fn test_check_passes_with_generous_limit() {
    let output = mainseq_cmd()
        .args(["check", &fixture_path(), "--max-distance", "1.0"])
        .output()
        .expect("failed to run mainseq check");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "check with a generous limit should pass: {stdout}"
    );
    assert!(
        stdout.contains("CHECK PASSED"),
        "should say CHECK PASSED: {stdout}"
    );
}

#[test]
fn test_analyze_json_output() {
    let output = mainseq_cmd()
        .args(["analyze", &fixture_path(), "--format", "json"])
        .output()
        .expect("failed to run mainseq analyze --format json");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "analyze --format json should succeed: {stdout}"
    );

    let parsed: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("output should be valid JSON");
    assert!(parsed.get("components").is_some(), "should have components");
    assert!(
        parsed.get("average_distance").is_some(),
        "should have average_distance"
    );

    let base = parsed["components"]
        .as_array()
        .expect("components should be an array")
        .iter()
        .find(|c| c["identifier"] == "app.base")
        .expect("app.base should be reported");
    assert_eq!(base["abstractness"], 1.0, "the only class in app.base is abstract");
    assert_eq!(base["instability"], 1.0, "app.base only imports the stdlib");
    assert_eq!(base["distance"], 1.0);
    assert_eq!(base["in_cycle"], false);

    let cycle_a = parsed["components"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["identifier"] == "app.cycle_a")
        .expect("app.cycle_a should be reported");
    assert_eq!(cycle_a["in_cycle"], true);

    assert_eq!(
        parsed["cycles"].as_array().map(|c| c.len()),
        Some(1),
        "exactly one cycle: {stdout}"
    );
}

#[test]
fn test_analyze_json_is_idempotent() {
    let run = || {
        let output = mainseq_cmd()
            .args(["analyze", &fixture_path(), "--format", "json"])
            .output()
            .expect("failed to run mainseq analyze");
        String::from_utf8_lossy(&output.stdout).to_string()
    };
    assert_eq!(run(), run(), "two runs over the same tree must match exactly");
}

#[test]
fn test_init_creates_config() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let output = mainseq_cmd()
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run mainseq init");

    assert!(output.status.success(), "init should succeed");

    let config_path = dir.path().join(".mainseq.toml");
    assert!(config_path.exists(), ".mainseq.toml should be created");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(
        content.contains("[metrics]"),
        "should contain [metrics] section"
    );
    assert!(
        content.contains("distance_threshold"),
        "should contain the threshold setting"
    );
}

#[test]
fn test_init_refuses_overwrite() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(dir.path().join(".mainseq.toml"), "existing").unwrap();

    let output = mainseq_cmd()
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run mainseq init");

    assert!(!output.status.success(), "init should fail when file exists");
}

#[test]
fn test_unknown_format_is_an_error() {
    let output = mainseq_cmd()
        .args(["analyze", &fixture_path(), "--format", "yaml"])
        .output()
        .expect("failed to run mainseq analyze");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown format"), "stderr: {stderr}");
}
