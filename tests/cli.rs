//! Binary-level tests: argument validation, credential loading, exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The binary with no credentials reachable from the environment.
fn bridge(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("meross-bridge").unwrap();
    cmd.env_remove("MEROSS_EMAIL")
        .env_remove("MEROSS_PASSWORD")
        .env_remove("MEROSS_REGION")
        .env_remove("MEROSS_MFA_CODE")
        .env_remove("MEROSS_API_URL")
        .env_remove("RUST_LOG")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path());
    cmd
}

#[test]
fn help_lists_underscore_flags() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--set_on"))
        .stdout(predicate::str::contains("--show_yesterday"))
        .stdout(predicate::str::contains("--refresh"));
}

#[test]
fn missing_credentials() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .arg("--show")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("missing_credentials"))
        .stderr(predicate::str::contains("Can't get email and password"));
}

#[test]
fn unreadable_config_names_the_path() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.ini");
    bridge(&home)
        .args(["--show", "--config"])
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"config\""))
        .stderr(predicate::str::contains("nope.ini"));
}

#[test]
fn config_from_user_config_dir_is_used() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("meross-bridge");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.ini"),
        "[secret]\nemail = user@example.com\npassword = hunter2\n",
    )
    .unwrap();

    // No cloud action: credentials load, nothing is refreshed.
    bridge(&home)
        .arg("--show")
        .assert()
        .success()
        .stdout(predicate::str::diff("{}\n"));
}

#[test]
fn scalar_output_needs_selector() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["--refresh", "--show_power"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid_input"));
}

#[test]
fn switching_by_mac_alone_is_rejected() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["--mac", "48:e1:e9:00:00:01", "--set_on"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MAC alone"));
}

#[test]
fn conflicting_switch_flags() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["--name", "Fridge", "--set_on", "--set_off"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn unknown_device_without_refresh() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["--email", "a@b.c", "--password", "x", "--name", "Fridge", "--show"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("device_not_found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_login_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/Auth/signIn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiStatus": 1004,
            "sysStatus": 0,
            "info": "Wrong password",
            "data": null
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    bridge(&home)
        .env("MEROSS_API_URL", server.uri())
        .args(["--email", "user@example.com", "--password", "bad", "--refresh"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("\"auth\""))
        .stderr(predicate::str::contains("Wrong password"));
}
