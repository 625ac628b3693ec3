//! End-to-end checks of the `ferry` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ferry(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ferry").unwrap();
    cmd.current_dir(home.path())
        .env("FERRY_CONFIG_DIR", home.path())
        .env_remove("FERRY_ENDPOINT")
        .env_remove("FERRY_CHAT_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    ferry(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("chat"));
}

#[test]
fn test_config_path_honors_env() {
    let home = TempDir::new().unwrap();
    let expected = home.path().join("config.toml");
    ferry(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    ferry(&home).args(["config", "init"]).assert().success();
    assert!(home.path().join("config.toml").is_file());

    ferry(&home)
        .args(["--endpoint", "ws://example.test:9000/mcp", "--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ws://example.test:9000/mcp"));
}

#[test]
fn test_invalid_config_value_rejected() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("ferry.toml"),
        "[mcp]\nconnect_timeout_secs = 0\n",
    )
    .unwrap();

    ferry(&home)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mcp.connect_timeout_secs"));
}

#[test]
fn test_call_without_host_fails() {
    let home = TempDir::new().unwrap();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    ferry(&home)
        .args(["--endpoint", &format!("ws://127.0.0.1:{}", port), "call", "echo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not reach tool host"));
}
