//! Integration tests for the `scangraph` binary.
//!
//! Runs the compiled binary against real TOML files and checks output and exit codes.
//! None of these tests reach a real API.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const VALID_CONFIG: &str = r#"
[general]
log_level = "info"
log_format = "json"

[tenable]
access_key = "access-key-value"
secret_key = "secret-key-value"
retry_max_attempts = 1
request_timeout_secs = 2

[export]
asset_chunk_size = 250
poll_interval_ms = 500

[sync]
include_containers = true
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("scangraph.toml");
    fs::write(&path, content).expect("should write config");
    path
}

/// 호스트 환경의 `SCANGRAPH_*` 변수를 제거한 상태로 바이너리를 실행합니다.
fn scangraph(config: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scangraph"));
    for (key, _) in std::env::vars() {
        if key.starts_with("SCANGRAPH_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("RUST_LOG", "off")
        .arg("--config")
        .arg(config)
        .args(args)
        .envs(env.iter().copied());
    cmd.output().expect("should run scangraph binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("valid UTF-8")
}

#[test]
fn test_config_show_redacts_keys() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, VALID_CONFIG);

    let output = scangraph(&path, &["config", "show"], &[]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("[tenable]"), "should show tenable section");
    assert!(text.contains("***REDACTED***"), "should redact keys");
    assert!(!text.contains("secret-key-value"), "secret must not leak");
    assert!(text.contains("asset_chunk_size = 250"));
}

#[test]
fn test_config_show_json_output() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, VALID_CONFIG);

    let output = scangraph(&path, &["--output", "json", "config", "show", "--section", "tenable"], &[]);

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["section"], "tenable");
    assert_eq!(json["config"]["access_key"], "***REDACTED***");
    assert_eq!(json["config"]["retry_max_attempts"], 1);
}

#[test]
fn test_config_show_applies_env_overrides() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "");

    let output = scangraph(
        &path,
        &["--output", "json", "config", "show"],
        &[
            ("SCANGRAPH_EXPORT_VULN_NUM_ASSETS", "75"),
            ("SCANGRAPH_TENABLE_SECRET_KEY", "from-env"),
        ],
    );

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["config"]["export"]["vuln_num_assets"], 75);
    assert_eq!(json["config"]["tenable"]["secret_key"], "***REDACTED***");
    assert_eq!(json["config"]["tenable"]["access_key"], "");
}

#[test]
fn test_config_show_unknown_section_exits_1() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, VALID_CONFIG);

    let output = scangraph(&path, &["config", "show", "--section", "nonexistent"], &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown section: nonexistent"));
}

#[test]
fn test_missing_config_file_exits_2() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("absent.toml");

    let output = scangraph(&path, &["config", "show"], &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn test_invalid_setting_exits_2() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[export]\nasset_chunk_size = 0\n");

    let output = scangraph(&path, &["config", "show"], &[]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_validate_offline_valid_config() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, VALID_CONFIG);

    let output = scangraph(&path, &["--output", "json", "validate", "--offline"], &[]);

    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["valid"], true);
    assert_eq!(json["offline"], true);
}

#[test]
fn test_validate_offline_missing_credentials_exits_2() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "[tenable]\naccess_key = \"only-access\"\n");

    let output = scangraph(&path, &["validate", "--offline"], &[]);

    assert_eq!(output.status.code(), Some(2));
    let text = stdout(&output);
    assert!(text.contains("INVALID"));
    assert!(text.contains("tenable.secret_key"));
}

#[test]
fn test_validate_credentials_from_env() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(&dir, "");

    let output = scangraph(
        &path,
        &["validate", "--offline"],
        &[
            ("SCANGRAPH_TENABLE_ACCESS_KEY", "a"),
            ("SCANGRAPH_TENABLE_SECRET_KEY", "s"),
        ],
    );

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("VALID"));
}

#[test]
fn test_sync_without_credentials_never_contacts_api() {
    let dir = TempDir::new().expect("should create temp dir");
    // 연결 가능한 서버가 없는 주소; 자격 증명 검사가 먼저 실패해야 합니다.
    let path = write_config(&dir, "[tenable]\nbase_url = \"http://127.0.0.1:1\"\n");

    let out = dir.path().join("graph.json");
    let out_arg = out.to_str().expect("utf-8 path");

    let output = scangraph(&path, &["sync", "--out", out_arg], &[]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!out.exists());
}

#[test]
fn test_validate_unreachable_api_is_authentication_failure() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = write_config(
        &dir,
        r#"
[tenable]
access_key = "a"
secret_key = "s"
base_url = "http://127.0.0.1:1"
retry_max_attempts = 1
request_timeout_secs = 2
"#,
    );

    let output = scangraph(&path, &["--output", "json", "validate"], &[]);

    assert_eq!(output.status.code(), Some(3));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(json["valid"], false);
    assert_eq!(json["offline"], false);
}
