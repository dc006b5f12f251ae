//! Sandbox for running the binary against a throwaway ledger.

use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Config file and database inside a temporary directory.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let database = dir.path().join("ledger.db");
        let config = format!(
            "database = {:?}\n\n[notifications]\nlog = false\n",
            database.to_string_lossy()
        );
        std::fs::write(dir.path().join("driftpool.toml"), config).expect("write config");
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("driftpool.toml")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// The binary, run from the sandbox with its config.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("driftpool").expect("binary");
        cmd.current_dir(self.dir.path())
            .env_remove("DRIFTPOOL_WEBHOOK_URL")
            .arg("--color")
            .arg("never")
            .arg("--config")
            .arg(self.config_path());
        cmd
    }

    /// Run with `--json` and return every emitted line of the given type.
    pub fn json(&self, args: &[&str]) -> Vec<Value> {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run binary");
        assert!(
            output.status.success(),
            "driftpool {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }
}

/// Payloads of lines whose `type` is `kind`.
pub fn payloads(lines: &[Value], kind: &str) -> Vec<Value> {
    lines
        .iter()
        .filter(|line| line["type"] == kind)
        .map(|line| line["payload"].clone())
        .collect()
}
