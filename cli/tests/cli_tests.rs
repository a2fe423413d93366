//! Integration tests for the agora CLI surface.
//!
//! Every test runs against a private `AGORA_HOME` (and `AGORA_AGENT_HOME`)
//! inside a temp directory; registry-touching commands use the local
//! registry override so nothing reaches the network.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn agora(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("agora").expect("agora binary should exist");
    cmd.env("AGORA_HOME", home.join(".agora"))
        .env("AGORA_AGENT_HOME", home)
        .env("NO_COLOR", "1");
    cmd
}

fn write_local_registry(home: &Path) -> std::path::PathBuf {
    let index = home.join("registry-index.json");
    std::fs::write(
        &index,
        serde_json::json!({
            "packages": {
                "stacks": {
                    "official": [{
                        "id": "github-tools",
                        "name": "GitHub Tools",
                        "version": "1.2.0",
                        "description": "Issue and PR helpers",
                        "tags": ["github"]
                    }],
                    "community": []
                },
                "binaries": {
                    "official": [{
                        "id": "binary:ripgrep",
                        "name": "ripgrep",
                        "version": "14.1.0",
                        "description": "line-oriented search",
                        "binary": "rg"
                    }],
                    "community": []
                }
            }
        })
        .to_string(),
    )
    .expect("write local index");
    index
}

fn write_local_stack(home: &Path) -> std::path::PathBuf {
    let dir = home.join("demo-stack");
    std::fs::create_dir_all(dir.join("dist")).expect("mkdir");
    std::fs::write(
        dir.join("stack.yaml"),
        "id: demo\nname: Demo Stack\nversion: 1.0.0\ncommand: [node, dist/index.js]\n",
    )
    .expect("write stack.yaml");
    std::fs::write(dir.join("dist/index.js"), "// server\n").expect("write entry");
    dir
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    let tmp = tempfile::tempdir().expect("tempdir");
    agora(tmp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Local package manager for AI-agent tooling"));
}

#[test]
fn test_cli_help_lists_commands() {
    let tmp = tempfile::tempdir().expect("tempdir");
    agora(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("agents"));
}

#[test]
fn test_version_command_prints_version() {
    let tmp = tempfile::tempdir().expect("tempdir");
    agora(tmp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("agora {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_version_json_is_machine_readable() {
    let tmp = tempfile::tempdir().expect("tempdir");
    agora(tmp.path())
        .arg("version")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "{{\"version\":\"{}\"}}",
            env!("CARGO_PKG_VERSION")
        )));
}

// --- Registry search (local index, no network) ---

#[test]
fn test_search_hits_local_registry() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let index = write_local_registry(tmp.path());
    agora(tmp.path())
        .env("USE_LOCAL_REGISTRY", "true")
        .env("AGORA_LOCAL_REGISTRY", &index)
        .args(["search", "ripgrep"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ripgrep"));
}

#[test]
fn test_search_kind_filter_excludes_other_kinds() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let index = write_local_registry(tmp.path());
    agora(tmp.path())
        .env("USE_LOCAL_REGISTRY", "true")
        .env("AGORA_LOCAL_REGISTRY", &index)
        .args(["search", "ripgrep", "--kind", "stack", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"results\": []"));
}

#[test]
fn test_info_reports_not_installed() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let index = write_local_registry(tmp.path());
    agora(tmp.path())
        .env("USE_LOCAL_REGISTRY", "true")
        .env("AGORA_LOCAL_REGISTRY", &index)
        .args(["info", "binary:ripgrep", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"installed\": false"));
}

// --- Local install round trip ---

#[test]
fn test_local_install_list_uninstall_round_trip() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let stack_dir = write_local_stack(tmp.path());

    agora(tmp.path())
        .args(["install", "--path"])
        .arg(&stack_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("stack:demo"));

    agora(tmp.path())
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stack:demo"));

    agora(tmp.path())
        .args(["uninstall", "stack:demo"])
        .assert()
        .success();

    agora(tmp.path())
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"installed\": []"));
}

// --- Agent registration (S5 shape) ---

#[test]
fn test_agents_register_writes_claude_code_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let stack_dir = write_local_stack(tmp.path());
    std::fs::write(tmp.path().join(".claude.json"), "{}").expect("agent config");

    agora(tmp.path())
        .args(["install", "--path"])
        .arg(&stack_dir)
        .assert()
        .success();

    agora(tmp.path())
        .args(["agents", "register", "demo", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"claude-code\""))
        .stdout(predicate::str::contains("\"success\": true"))
        .stdout(predicate::str::contains("Agent not installed"));

    let config = std::fs::read_to_string(tmp.path().join(".claude.json")).expect("read");
    assert!(config.contains("\"demo\""));
    assert!(config.contains("\"stdio\""));

    agora(tmp.path())
        .args(["agents", "unregister", "demo"])
        .assert()
        .success();
    let config = std::fs::read_to_string(tmp.path().join(".claude.json")).expect("read");
    assert!(!config.contains("\"demo\""));
}

// --- Secrets ---

#[test]
fn test_config_set_secret_then_listed_configured() {
    let tmp = tempfile::tempdir().expect("tempdir");
    agora(tmp.path())
        .args(["config", "set-secret", "GITHUB_TOKEN", "ghp_x"])
        .assert()
        .success();

    agora(tmp.path())
        .args(["config", "secrets", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"configured\": true"));
}

// --- Prompts ---

#[test]
fn test_prompts_render_single_file_template() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let prompts_dir = tmp.path().join(".agora/prompts");
    std::fs::create_dir_all(&prompts_dir).expect("mkdir");
    std::fs::write(prompts_dir.join("review.md"), "Review {{file}} for bugs.")
        .expect("write prompt");

    agora(tmp.path())
        .args(["prompts", "render", "review", "--var", "file=main.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Review main.rs for bugs."));

    agora(tmp.path())
        .args(["prompts", "render", "review"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required variables: file"));
}

// --- Sessions ---

#[test]
fn test_sessions_stats_empty_database() {
    let tmp = tempfile::tempdir().expect("tempdir");
    agora(tmp.path())
        .args(["sessions", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing imported yet"));
}

// --- Error shapes ---

#[test]
fn test_invalid_package_id_json_error_code() {
    let tmp = tempfile::tempdir().expect("tempdir");
    agora(tmp.path())
        .args(["uninstall", "plugin:nope", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"code\": \"invalid_package_id\""))
        .stderr(predicate::str::contains("Error:"));
}
