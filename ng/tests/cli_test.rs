//! Smoke tests for the notegen binary

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Isolated home, config, and database for one test
struct Sandbox {
    dir: TempDir,
    config: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("notegen.yml");
        let yaml = format!(
            "llm:\n  api-key-env: NOTEGEN_CLI_TEST_KEY\nstorage:\n  database: {}\nprompts:\n  dir: {}\n",
            dir.path().join("notegen.db").display(),
            dir.path().join("prompts").display()
        );
        std::fs::write(&config, yaml).unwrap();
        Self { dir, config }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("notegen"));
        cmd.env("HOME", self.dir.path())
            .env("XDG_DATA_HOME", self.dir.path().join("data"))
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env_remove("NOTEGEN_CLI_TEST_KEY")
            .current_dir(self.dir.path())
            .arg("--config")
            .arg(&self.config)
            .stdin(Stdio::null());
        cmd
    }
}

#[test]
fn help_lists_subcommands() {
    Command::new(assert_cmd::cargo::cargo_bin!("notegen"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("topics"))
        .stdout(predicate::str::contains("plans"))
        .stdout(predicate::str::contains("articles"));
}

#[test]
fn unknown_route_exits_nonzero() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["request", "GET", "/api/nope"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Not found"))
        .stderr(predicate::str::contains("Error (404)"));
}

#[test]
fn add_then_list_topics() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["topics", "add", "--name", "議事録の自動化", "--category", "business-efficiency", "-p", "8"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"available\""));

    sandbox
        .cmd()
        .args(["topics", "list", "--status", "available"])
        .assert()
        .success()
        .stdout(predicate::str::contains("議事録の自動化"))
        .stdout(predicate::str::contains("\"priority\": 8"));
}

#[test]
fn generation_without_credential_is_logged_failure() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["topics", "generate", "-n", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOTEGEN_CLI_TEST_KEY"));

    sandbox
        .cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"generationsFailed\": 1"));

    sandbox
        .cmd()
        .args(["logs", "--stage", "topic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": false"));
}

#[test]
fn generate_plan_without_id_is_rejected_by_clap() {
    let sandbox = Sandbox::new();
    sandbox.cmd().args(["plans", "generate"]).assert().failure();
}
