//! Command-line behaviour of sub-post that needs no network access

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// sub-post rooted in `dir`, isolated from any user settings file
fn sub_post(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sub-post").unwrap();
    cmd.current_dir(dir)
        .env("SUBCAST_CONFIG", dir.join("no-such-config.toml"))
        .env_remove("SUBCAST_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_credentials(dir: &Path, client_id: &str) {
    let credentials = serde_json::json!({
        "client_id": client_id,
        "client_secret": "secret",
        "user_agent": "SubcastTests/1.0",
        "username": "tester",
        "password": "hunter2"
    });
    fs::write(dir.join("credentials.json"), credentials.to_string()).unwrap();
}

#[test]
fn test_help_lists_options() {
    let temp_dir = TempDir::new().unwrap();
    sub_post(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dashboard"))
        .stdout(predicate::str::contains("--delay"))
        .stdout(predicate::str::contains("--export"));
}

#[test]
fn test_first_run_scaffolds_and_refuses_placeholders() {
    let temp_dir = TempDir::new().unwrap();

    sub_post(temp_dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Created sample"))
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("sample values"));

    let credentials = fs::read_to_string(temp_dir.path().join("credentials.json")).unwrap();
    assert!(credentials.contains("YOUR_CLIENT_ID"));

    let posts: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp_dir.path().join("post_config.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(posts.as_array().unwrap().len(), 2);
    assert_eq!(posts[0]["subreddit"], "test");

    // Nothing was attempted, so nothing was exported
    assert!(!temp_dir.path().join("events.json").exists());
}

#[test]
fn test_scaffolding_never_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let posts = r#"[{"subreddit": "rust", "title": "Mine", "content": "kept"}]"#;
    fs::write(temp_dir.path().join("post_config.json"), posts).unwrap();
    write_credentials(temp_dir.path(), "YOUR_CLIENT_ID");

    sub_post(temp_dir.path()).assert().code(1);

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("post_config.json")).unwrap(),
        posts
    );
}

#[test]
fn test_empty_post_config_is_invalid_input() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("posts.json"), "[]").unwrap();
    write_credentials(temp_dir.path(), "abc123");

    sub_post(temp_dir.path())
        .args(["--config", "posts.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No valid post configuration found"));
}

#[test]
fn test_malformed_post_config() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("posts.json"), "[{\"subreddit\": ").unwrap();

    sub_post(temp_dir.path())
        .args(["--config", "posts.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse"));
}

#[test]
fn test_incomplete_credentials() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("creds.json"),
        r#"{"client_id": "abc", "user_agent": "x", "username": "u", "password": "p"}"#,
    )
    .unwrap();

    sub_post(temp_dir.path())
        .args(["--credentials", "creds.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("client_secret"));
}

#[test]
fn test_invalid_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("config.toml");
    fs::write(&settings, "[posting\nport = ").unwrap();

    sub_post(temp_dir.path())
        .env("SUBCAST_CONFIG", &settings)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_rejects_unknown_format() {
    let temp_dir = TempDir::new().unwrap();
    sub_post(temp_dir.path())
        .args(["--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("xml"));
}
