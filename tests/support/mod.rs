#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A scratch data directory with helpers for driving `ql` against it.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.file("questlog.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `ql` pointed at this data dir, with no inherited identity.
    pub fn cmd(&self) -> Command {
        let mut cmd = ql_cmd();
        cmd.env("QUESTLOG_DIR", self.path());
        cmd
    }

    /// `ql` acting as `user`.
    pub fn cmd_as(&self, user: &str) -> Command {
        let mut cmd = self.cmd();
        cmd.env("QUESTLOG_USER", user);
        cmd
    }

    /// Run `ql --json <args>` as `user`, assert success, and return the envelope.
    pub fn json_as(&self, user: &str, args: &[&str]) -> Value {
        let output = self
            .cmd_as(user)
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json output")
    }

    /// Create a task and return its id.
    pub fn new_task(&self, user: &str, title: &str, priority: &str) -> String {
        let value = self.json_as(user, &["task", "new", title, "--priority", priority]);
        value["data"]["id"].as_str().expect("task id").to_string()
    }
}

pub fn ql_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ql").expect("binary");
    cmd.env_remove("QUESTLOG_DIR")
        .env_remove("QUESTLOG_USER")
        .env_remove("RUST_LOG");
    cmd
}
