//! Common test utilities and fixtures
//!
//! Every command runs in its own temporary directory with a scrubbed
//! environment, so no real config file, `.env` or API key is picked up.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Environment variables the binary reads
const SCRUBBED_ENV: &[&str] = &[
    "GROQ_API_KEY",
    "SERPER_API_KEY",
    "RUST_LOG",
    "CREWLINE_CONFIG",
    "CREWLINE_BACKEND",
    "CREWLINE_LLM_BASE_URL",
    "CREWLINE_LLM_MODEL",
    "CREWLINE_LLM_TEMPERATURE",
    "CREWLINE_LLM_TIMEOUT_SECS",
    "CREWLINE_LLM_MAX_RETRIES",
    "CREWLINE_SEARCH_BASE_URL",
    "CREWLINE_SEARCH_NUM_RESULTS",
    "CREWLINE_MAX_TOOL_ROUNDS",
    "CREWLINE_VERBOSE",
    "CREWLINE_OUTPUT_DIR",
    "CREWLINE_LOG_LEVEL",
    "CREWLINE_LOG_FILE",
    "CREWLINE_LOG_JSON",
];

/// Isolated working directory for one test
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file relative to the sandbox root
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.join(name)).unwrap()
    }

    /// The crewline binary, running inside this sandbox
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("crewline").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.join(".config"));
        for var in SCRUBBED_ENV {
            cmd.env_remove(var);
        }
        cmd
    }
}
