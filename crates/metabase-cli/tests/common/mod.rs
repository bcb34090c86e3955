#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;

use serde_json::Value;
use tokio::process::Command;

const METABASE_ENV: &[&str] = &[
    "METABASE_URL",
    "METABASE_API_KEY",
    "METABASE_SESSION_ID",
    "METABASE_USERNAME",
    "METABASE_PASSWORD",
];

/// An isolated home directory for one CLI invocation sequence.
pub struct Sandbox {
    dir: tempfile::TempDir,
    env: Vec<(String, String)>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
            env: Vec::new(),
        }
    }

    /// A sandbox authenticated by API key through the environment.
    pub fn with_api_key(url: &str, key: &str) -> Self {
        Self::new()
            .env("METABASE_URL", url)
            .env("METABASE_API_KEY", key)
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the CLI keeps its profiles on Linux.
    pub fn config_path(&self) -> PathBuf {
        self.dir
            .path()
            .join("config")
            .join("metabasecli")
            .join("config.toml")
    }

    pub fn write_config(&self, toml: &str) {
        let path = self.config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, toml).unwrap();
    }

    /// Run the CLI binary with arguments.
    pub async fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_metabase"));
        cmd.args(args)
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        for key in METABASE_ENV {
            cmd.env_remove(key);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.output().await.expect("Failed to execute CLI")
    }

    /// Run the CLI and expect success.
    pub async fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args).await;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            panic!(
                "CLI command failed: {:?}\nstdout: {}\nstderr: {}",
                args, stdout, stderr
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run the CLI expecting failure and return its JSON error envelope.
    pub async fn run_failure_json(&self, args: &[&str]) -> Value {
        let output = self.run(args).await;
        if output.status.success() {
            panic!("CLI command should have failed: {:?}", args);
        }
        parse_json(&output.stdout)
    }
}

pub fn parse_json(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(stdout)
        )
    })
}
