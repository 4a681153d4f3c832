//! Integration tests for the `ecm` CLI binary.
//!
//! These cover argument parsing, help output, shell completions and the
//! failure paths that happen before any request reaches ECM.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const NOWHERE: &str = "/tmp/ecmcli-test-nonexistent";

/// Build a [`Command`] for the `ecm` binary with env isolation.
///
/// Clears all `ECM_*` env vars and points config and data directories at
/// a nonexistent path so tests never touch the user's real configuration
/// or saved sessions.
fn ecm_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("ecm");
    cmd.env("HOME", NOWHERE)
        .env("XDG_CONFIG_HOME", NOWHERE)
        .env("XDG_DATA_HOME", NOWHERE)
        .env_remove("ECM_PROFILE")
        .env_remove("ECM_API_SITE")
        .env_remove("ECM_API_USERNAME")
        .env_remove("ECM_API_PASSWORD")
        .env_remove("ECM_PASSWORD")
        .env_remove("ECM_ACCOUNT")
        .env_remove("ECM_OUTPUT")
        .env_remove("ECM_INSECURE")
        .env_remove("ECM_TIMEOUT");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_off_terminal_shows_help() {
    let output = ecm_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    ecm_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("ECM")
            .and(predicate::str::contains("routers"))
            .and(predicate::str::contains("accounts"))
            .and(predicate::str::contains("remote"))
            .and(predicate::str::contains("activity-log")),
    );
}

#[test]
fn test_version_flag() {
    ecm_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ecm"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completion_bash() {
    ecm_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ecm"));
}

#[test]
fn test_completion_zsh() {
    ecm_cmd()
        .args(["completion", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_alias() {
    ecm_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_build_writes_completions_and_man_pages() {
    let assets = std::path::Path::new(option_env!("ECM_ASSETS_DIR").unwrap_or(env!("OUT_DIR")));
    for script in ["ecm.bash", "_ecm", "ecm.fish", "ecm.elv", "_ecm.ps1"] {
        assert!(assets.join("completions").join(script).is_file(), "{script}");
    }
    for page in ["ecm.1", "ecm-routers.1", "ecm-remote-get.1"] {
        assert!(assets.join("man").join(page).is_file(), "{page}");
    }
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = ecm_cmd().arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_routers_without_credentials() {
    ecm_cmd()
        .args(["routers", "ls"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No credentials"));
}

#[test]
fn test_username_without_password() {
    ecm_cmd()
        .args(["--api-username", "ops@example.com", "alerts"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_unknown_profile() {
    ecm_cmd()
        .args(["--profile", "nope", "routers", "ls"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_invalid_api_site() {
    ecm_cmd()
        .args(["--api-site", "not a url", "routers", "ls"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid URL"));
}

#[test]
fn test_invalid_output_format() {
    let output = ecm_cmd()
        .args(["--output", "invalid", "routers", "ls"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_cli_requires_a_command() {
    ecm_cmd().args(["cli", "hq"]).assert().code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    ecm_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile"));
}

#[test]
fn test_config_profiles_empty() {
    ecm_cmd()
        .args(["config", "profiles"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No profiles configured"));
}

#[test]
fn test_config_set_and_use() {
    let dir = tempfile::tempdir().unwrap();
    let run = |args: &[&str]| {
        let mut cmd = ecm_cmd();
        cmd.env("HOME", dir.path())
            .env("XDG_CONFIG_HOME", dir.path())
            .env("XDG_DATA_HOME", dir.path());
        cmd.args(args).assert()
    };
    run(&["--profile", "lab", "config", "set", "timeout", "12"]).success();
    run(&["config", "use", "lab"]).success();
    run(&["config", "profiles"])
        .success()
        .stdout(predicate::str::contains("lab *"));
    run(&["config", "use", "missing"]).code(4);
    run(&["config", "set", "colour", "red"]).code(2);
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_routers_subcommands_exist() {
    ecm_cmd()
        .args(["routers", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ls")
                .and(predicate::str::contains("edit"))
                .and(predicate::str::contains("move"))
                .and(predicate::str::contains("groupassign")),
        );
}

#[test]
fn test_remote_subcommands_exist() {
    ecm_cmd()
        .args(["remote", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("get")
                .and(predicate::str::contains("set"))
                .and(predicate::str::contains("dtd")),
        );
}

#[test]
fn test_tos_accept_flag() {
    ecm_cmd()
        .args(["tos", "accept", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--i-accept-the-ecm-terms-of-service"));
}

#[test]
fn test_authorizations_subcommands_exist() {
    ecm_cmd()
        .args(["authorizations", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create")
                .and(predicate::str::contains("edit"))
                .and(predicate::str::contains("roles")),
        );
}

#[test]
fn test_features_and_apps_subcommands_exist() {
    ecm_cmd()
        .args(["features", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("addrouter").and(predicate::str::contains("removerouter")),
        );
    ecm_cmd()
        .args(["apps", "deploys", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("install"));
}

#[test]
fn test_clients_help_lists_long_flag() {
    ecm_cmd()
        .args(["clients", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--long"));
}
