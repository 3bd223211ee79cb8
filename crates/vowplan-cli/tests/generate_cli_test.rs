//! Integration tests for the `vowplan` binary.
//!
//! Each test runs the compiled binary with a private XDG config directory and
//! the `VOWPLAN_*` environment cleared, so no external service or database is
//! contacted.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};

const VOWPLAN_ENV: [&str; 5] = [
    "VOWPLAN_DATABASE_URL",
    "VOWPLAN_GENERATION_URL",
    "VOWPLAN_TODO_URL",
    "VOWPLAN_PLACES_API_KEY",
    "VOWPLAN_PLACES_BASE_URL",
];

fn vowplan(config_home: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vowplan"));
    cmd.args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("RUST_LOG", "warn");
    for var in VOWPLAN_ENV {
        cmd.env_remove(var);
    }
    cmd.output().expect("failed to run vowplan")
}

fn write_profile(dir: &Path, profile: &Value) -> std::path::PathBuf {
    let path = dir.join("profile.json");
    std::fs::write(&path, serde_json::to_string(profile).unwrap()).unwrap();
    path
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[test]
fn generate_dry_run_prints_fallback_plan() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_profile(
        tmp.path(),
        &json!({
            "userName": "Alex",
            "partnerName": "Sam",
            "weddingDateUndecided": true,
            "weddingLocation": "Austin, TX",
            "maxBudget": 30000
        }),
    );

    let output = vowplan(
        tmp.path(),
        &["generate", "--user-id", "cli-user", "--input", input.to_str().unwrap(), "--dry-run"],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let plan: Value = serde_json::from_slice(&output.stdout).expect("stdout is the plan JSON");
    assert_eq!(plan["usedFallback"], true);
    assert_eq!(plan["usedFallbackTodos"], true);
    assert_eq!(plan["templateUsed"], "date_undecided");
    assert_eq!(plan["budget"]["total"], 30000.0);
    assert_eq!(plan["vendors"].as_object().unwrap().len(), 5);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("users/cli-user"), "stderr: {stderr}");
}

#[test]
fn generate_accepts_wrapped_request_body() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_profile(
        tmp.path(),
        &json!({ "userId": "ignored", "weddingData": { "userName": "Alex", "weddingDate": "2030-06-15" } }),
    );

    let output = vowplan(
        tmp.path(),
        &["generate", "--user-id", "cli-user", "--input", input.to_str().unwrap(), "--dry-run"],
    );
    assert!(output.status.success());
    let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["templateUsed"], "date_decided");
}

#[test]
fn generate_rejects_empty_profile() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_profile(tmp.path(), &json!({}));

    let output = vowplan(
        tmp.path(),
        &["generate", "--user-id", "cli-user", "--input", input.to_str().unwrap(), "--dry-run"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("weddingData"));
}

#[test]
fn generate_reports_missing_input_file() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope.json");

    let output = vowplan(
        tmp.path(),
        &["generate", "--user-id", "u", "--input", missing.to_str().unwrap(), "--dry-run"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read input file"));
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let tmp = tempfile::tempdir().unwrap();

    let output = vowplan(
        tmp.path(),
        &["init", "--generation-url", "http://gen.test/plan", "--places-api-key", "secret-key"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("secret-key"), "key must not be echoed");

    let contents = std::fs::read_to_string(tmp.path().join("vowplan").join("config.toml")).unwrap();
    assert!(contents.contains("http://gen.test/plan"));

    let again = vowplan(tmp.path(), &["init"]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));

    let forced = vowplan(tmp.path(), &["init", "--force"]);
    assert!(forced.status.success());
}
