//! CLI integration tests
//!
//! These run the built binary and check parsing, configuration output and
//! exit codes. None of them reach a model provider.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn thesis2code_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_thesis2code"))
}

fn run(args: &[&str], env: &[(&str, &str)]) -> Output {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut command = Command::new(thesis2code_bin());
    command.current_dir(dir.path()).args(args);
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("Failed to execute thesis2code")
}

#[test]
fn test_help_lists_subcommands() {
    let output = run(&["--help"], &[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("generate"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_version() {
    let output = run(&["--version"], &[]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("thesis2code"));
}

#[test]
fn test_config_json_masks_secrets() {
    let output = run(
        &["config", "--format", "json"],
        &[
            ("THESIS2CODE_PROVIDER", "openai"),
            ("THESIS2CODE_MODEL", "gpt-4o-mini"),
            ("THESIS2CODE_API_KEY", "sk-secret-value"),
            ("THESIS2CODE_CODER_MODEL", "gpt-4o"),
        ],
    );
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("sk-secret-value"));
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(value["analyzer"]["model"], "gpt-4o-mini");
    assert_eq!(value["coder"]["model"], "gpt-4o");
    assert_eq!(value["analyzer"]["api_key_set"], true);
}

#[test]
fn test_config_rejects_unknown_provider() {
    let output = run(&["config"], &[("THESIS2CODE_PROVIDER", "carrier-pigeon")]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_generate_missing_document_fails() {
    let output = run(&["generate", "/nonexistent/thesis.pdf", "--quiet"], &[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_generate_requires_document() {
    let output = run(&["generate"], &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("DOCUMENT"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    let output = run(&["-v", "-q", "config"], &[]);
    assert!(!output.status.success());
}
