use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn registry_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("registry");
    path
}

fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/registry.sqlite"

[server]
bind = "127.0.0.1:8061"
{}"#,
        root.display(),
        extra
    );

    let config_path = config_dir.join("registry.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_registry(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = registry_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run registry binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env("");
    let (stdout, stderr, success) = run_registry(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/registry.sqlite").exists());
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config_path) = setup_test_env("");
    let (_, stderr, success) = run_registry(&config_path, &["init"]);
    assert!(success, "first init failed: {}", stderr);
    let (_, stderr, success) = run_registry(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_stats_after_init() {
    let (_tmp, config_path) = setup_test_env("");
    run_registry(&config_path, &["init"]);

    let (stdout, stderr, success) = run_registry(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Records:     0"), "stdout: {}", stdout);
}

#[test]
fn test_index_settings_uses_config() {
    let (_tmp, config_path) = setup_test_env("\n[search]\nmin_gram = 3\nmax_gram = 9\n");
    let (stdout, stderr, success) = run_registry(&config_path, &["index-settings"]);
    assert!(success, "index-settings failed: {}", stderr);

    let settings: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ngram = &settings["settings"]["analysis"]["filter"]["ngram"];
    assert_eq!(ngram["min_gram"], 3);
    assert_eq!(ngram["max_gram"], 9);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config_path) = setup_test_env("\n[codes]\nfacility_min = 500\nfacility_max = 10\n");
    let (_, stderr, success) = run_registry(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("facility_min"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, _, success) = run_registry(&tmp.path().join("absent.toml"), &["init"]);
    assert!(!success);
}
