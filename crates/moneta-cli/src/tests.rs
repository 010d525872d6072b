//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::path::PathBuf;

use crate::cli::AnalysisOptions;
use crate::commands;

fn default_options() -> AnalysisOptions {
    AnalysisOptions {
        start: None,
        end: None,
        balance: 0.0,
        std_threshold: 2.0,
    }
}

fn write_fixtures(dir: &std::path::Path) -> (PathBuf, PathBuf) {
    let categories = dir.join("categories.yaml");
    std::fs::write(
        &categories,
        "categories:\n  Groceries: [kroger]\n  Income: [payroll]\nbudgets:\n  Groceries: 300\n",
    )
    .unwrap();

    let input = dir.join("data");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(
        input.join("checking.csv"),
        "Date,Description,Amount,Running Bal.\n\
         01/02/2024,PAYROLL ACME,2000.00,2000.00\n\
         01/05/2024,KROGER #12,-80.00,1920.00\n",
    )
    .unwrap();
    (categories, input)
}

// ========== Check Command Tests ==========

#[test]
fn test_cmd_check_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let (categories, _) = write_fixtures(dir.path());
    assert!(commands::cmd_check(&categories).is_ok());
}

#[test]
fn test_cmd_check_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = commands::cmd_check(&dir.path().join("nope.yaml"));
    assert!(result.is_err());
}

#[test]
fn test_cmd_check_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "categories: {}\n").unwrap();
    assert!(commands::cmd_check(&path).is_err());
}

// ========== Analyze Command Tests ==========

#[test]
fn test_cmd_analyze_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let (categories, input) = write_fixtures(dir.path());
    let output = dir.path().join("out");

    let result = commands::cmd_analyze(&categories, &input, &output, &default_options());
    assert!(result.is_ok());
    assert!(output.join("transactions_clean.csv").exists());
    assert!(output.join("dashboard.json").exists());
    assert!(output.join("summary.txt").exists());

    let summary = std::fs::read_to_string(output.join("summary.txt")).unwrap();
    assert!(summary.contains("Income: $2000.00"));
}

#[test]
fn test_cmd_analyze_missing_input_dir() {
    let dir = tempfile::tempdir().unwrap();
    let (categories, _) = write_fixtures(dir.path());
    let result = commands::cmd_analyze(
        &categories,
        &dir.path().join("missing"),
        &dir.path().join("out"),
        &default_options(),
    );
    assert!(result.is_err());
}

// ========== Report Command Tests ==========

#[test]
fn test_cmd_report_text() {
    let dir = tempfile::tempdir().unwrap();
    let (categories, input) = write_fixtures(dir.path());
    let result = commands::cmd_report(&categories, &input, false, &default_options());
    assert!(result.is_ok());
}

#[test]
fn test_cmd_report_json() {
    let dir = tempfile::tempdir().unwrap();
    let (categories, input) = write_fixtures(dir.path());
    let result = commands::cmd_report(&categories, &input, true, &default_options());
    assert!(result.is_ok());
}

// ========== Shared Option Parsing Tests ==========

#[test]
fn test_build_config_applies_flags() {
    let dir = tempfile::tempdir().unwrap();
    let (categories, _) = write_fixtures(dir.path());
    let options = AnalysisOptions {
        start: Some("2024-01".to_string()),
        end: Some("2024-06".to_string()),
        balance: 500.0,
        std_threshold: 1.5,
    };
    let config = commands::build_config(&categories, &options).unwrap();
    assert_eq!(config.starting_balance, 500.0);
    assert_eq!(config.std_threshold, 1.5);
    assert_eq!(config.start_month.unwrap().to_string(), "2024-01");
    assert_eq!(config.end_month.unwrap().to_string(), "2024-06");
}

#[test]
fn test_build_config_rejects_bad_month() {
    let dir = tempfile::tempdir().unwrap();
    let (categories, _) = write_fixtures(dir.path());
    let options = AnalysisOptions {
        start: Some("January 2024".to_string()),
        ..default_options()
    };
    let result = commands::build_config(&categories, &options);
    assert!(result.is_err());
}
