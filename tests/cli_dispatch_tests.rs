use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_capexempt")
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Config file in `dir` pointing at the shared CSV fixtures.
fn write_config(dir: &Path, sources: &str) -> PathBuf {
    let path = dir.join("capexempt.yaml");
    let yaml = format!(
        "data_dir: {}\nsources:\n{sources}",
        fixtures_dir().display()
    );
    fs::write(&path, yaml).expect("write config");
    path
}

fn fixture_sources() -> &'static str {
    concat!(
        "  - file: employers_2024.csv\n    year: 2024\n",
        "  - file: employers_2025.csv\n    year: \"2025\"\n",
    )
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env("CAPEXEMPT_CONFIG", config)
        .env_remove("CAPEXEMPT_DATA_DIR")
        .env("RUST_LOG", "off")
        .output()
        .expect("capexempt should run")
}

#[test]
fn unknown_command_prints_usage() {
    let output = Command::new(bin()).arg("frobnicate").output().expect("should run");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: capexempt"));
}

#[test]
fn search_command_emits_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), fixture_sources());
    let output = run(&config, &["search", "--state", "MA"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("search should emit json");
    assert_eq!(payload["summary"]["total_matches"], 2);
    assert_eq!(payload["table"]["rows"][1][0], "Northside Clinic");
}

#[test]
fn results_command_prints_tab_separated_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), fixture_sources());
    let output = run(
        &config,
        &["results", "--category", "Government Agencies", "--table"],
    );

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Employer Name\tCity\tState"));
    assert!(lines[1].starts_with("Federal Research Agency\tWashington\tDC"));
}

#[test]
fn invalid_category_is_a_usage_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), fixture_sources());
    let output = run(&config, &["search", "--category", "Tech Startups"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid categories"));
}

#[test]
fn export_command_writes_csv() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), fixture_sources());
    let out_path = dir.path().join("export.csv");
    let out_arg = out_path.to_string_lossy().to_string();
    let output = run(&config, &["export", &out_arg, "--include-all", "--min-score", "0"]);

    assert_eq!(output.status.code(), Some(0));
    let csv = fs::read_to_string(&out_path).expect("export file");
    assert!(csv.starts_with("Employer Name,City,State"));
    assert!(csv.contains("Globex Corp"));
}

#[test]
fn export_command_requires_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), fixture_sources());
    let output = run(&config, &["export"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: capexempt export"));
}

#[test]
fn export_without_data_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), "  - file: nowhere.csv\n    year: 2024\n");
    let out_path = dir.path().join("export.csv");
    let out_arg = out_path.to_string_lossy().to_string();
    let output = run(&config, &["export", &out_arg]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!out_path.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no data available"));
}

#[test]
fn validate_command_reports_findings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), fixture_sources());
    let output = run(&config, &["validate"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[warning]"));
    assert!(stdout.contains("looks like a ZIP code"));
    assert!(stdout.contains("validation passed: 11 records"));
}

#[test]
fn facets_command_lists_cities() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path(), fixture_sources());
    let output = run(&config, &["facets"]);

    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).expect("json");
    let cities = payload["cities"].as_array().expect("cities");
    assert!(cities.iter().any(|c| c == "Boston, MA"));
}
