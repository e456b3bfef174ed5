// Common test utilities shared across acceptance tests
//
// Every test gets its own config file and cache directory inside a TempDir,
// passed to the binary through KASHER_CONFIG and KASHER_CACHE_DIR. Nothing
// touches the user's XDG locations, so tests can run in parallel.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config").join("config.toml")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.path().join("cache")
    }

    pub fn cache_entry(&self, task: &str) -> PathBuf {
        self.cache_dir().join(format!("{task}.cache"))
    }

    /// File the counting command appends to on every execution
    pub fn counter_path(&self) -> PathBuf {
        self.path().join("runs.log")
    }

    /// Shell command that records each execution and prints `message`
    pub fn counting_command(&self, message: &str) -> String {
        format!(
            "echo run >> '{}'; echo {}",
            self.counter_path().display(),
            message
        )
    }

    /// Number of times the counting command has executed
    pub fn run_count(&self) -> usize {
        fs::read_to_string(self.counter_path())
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    pub fn config_contents(&self) -> String {
        fs::read_to_string(self.config_path()).unwrap_or_default()
    }

    pub fn write_config(&self, contents: &str) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// kasher binary isolated to this workspace
    pub fn kasher(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_kasher"));
        cmd.env("KASHER_CONFIG", self.config_path())
            .env("KASHER_CACHE_DIR", self.cache_dir())
            .env_remove("KASHER_SHELL")
            .env_remove("RUST_LOG")
            .current_dir(self.path());
        cmd
    }

    /// `kasher task create <name> --command <command> --ttl <ttl>`
    pub fn create_task(&self, name: &str, command: &str, ttl: &str) {
        self.kasher()
            .args(["task", "create", name, "--command", command, "--ttl", ttl])
            .assert()
            .success();
    }
}
