//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

mod common;

use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;

use common::Sandbox;

/// Test fixture for configuration testing
struct ConfigFixture {
    sandbox: Sandbox,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let sandbox = Sandbox::new();
        let config_path = sandbox.join("config.toml");
        Self { sandbox, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn validate(&self) -> assert_cmd::assert::Assert {
        self.sandbox
            .cmd()
            .args(["config", "validate", "--config", self.path()])
            .assert()
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_empty_config_uses_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");
    fixture.validate().success();
}

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
model = "llama3-70b-8192"
"#,
    );

    fixture.validate().success();
    fixture
        .sandbox
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("llama3-70b-8192"));
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
backend = "openai"
base_url = "http://localhost:11434/v1"
model = "llama3"
temperature = 0.7
timeout_secs = 60
max_retries = 2

[search]
base_url = "https://google.serper.dev"
num_results = 10
timeout_secs = 15

[pipeline]
max_tool_rounds = 3
verbose = true

[output]
dir = "reports"

[logging]
level = "debug"
max_files = 3
json_format = true
"#,
    );

    fixture.validate().success();
}

#[test]
fn test_config_file_in_working_directory() {
    let sandbox = Sandbox::new();
    sandbox.write("crewline.toml", "[llm]\nmodel = \"from-working-dir\"\n");

    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-working-dir"));
}

#[test]
fn test_config_path_from_environment() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[llm]\nmodel = \"from-env-path\"\n");

    fixture
        .sandbox
        .cmd()
        .args(["config", "show"])
        .env("CREWLINE_CONFIG", fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env-path"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_missing_config_file() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "validate", "--config"])
        .arg(sandbox.join("missing.toml"))
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[llm\nmodel = ");

    fixture
        .validate()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_invalid_base_url() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[llm]\nbase_url = \"not a url\"\n");

    fixture
        .validate()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("llm.base_url"));
}

#[test]
fn test_non_http_scheme_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[search]\nbase_url = \"ftp://google.serper.dev\"\n");

    fixture.validate().failure().code(10);
}

#[test]
fn test_invalid_temperature() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[llm]\ntemperature = 3.5\n");

    fixture
        .validate()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("temperature"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[logging]\nlevel = \"loud\"\n");

    fixture
        .validate()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("logging.level"));
}

#[test]
fn test_search_results_above_cap() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[search]\nnum_results = 50\n");

    fixture
        .validate()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("search.num_results"));
}

#[test]
fn test_zero_search_timeout() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[search]\ntimeout_secs = 0\n");

    fixture
        .validate()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("search.timeout_secs"));
}

#[test]
fn test_unknown_backend() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[llm]\nbackend = \"cuda\"\n");

    fixture.validate().failure().code(10);
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[llm]\nmodel = \"from-file\"\n");

    fixture
        .sandbox
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .env("CREWLINE_LLM_MODEL", "from-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env"))
        .stdout(predicate::str::contains("from-file").not());
}

#[test]
fn test_env_override_is_validated() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "validate"])
        .env("CREWLINE_LLM_BASE_URL", "nonsense")
        .assert()
        .failure()
        .code(10);
}

#[test]
fn test_output_dir_from_config_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
backend = "mock"
mock_response = "configured answer"

[output]
dir = "reports"
"#,
    );

    fixture
        .sandbox
        .cmd()
        .args(["run", "newsletter", "--config", fixture.path()])
        .assert()
        .success();

    assert_eq!(
        fixture.sandbox.read("reports/weekly_ai_newsletter.md"),
        "configured answer"
    );
}

#[test]
fn test_cli_flags_beat_config_file() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
backend = "mock"
mock_response = "configured answer"

[output]
dir = "reports"
"#,
    );

    fixture
        .sandbox
        .cmd()
        .args(["run", "newsletter", "--config", fixture.path()])
        .args(["--mock-response", "flag answer", "--output-dir", "elsewhere"])
        .assert()
        .success();

    assert_eq!(
        fixture.sandbox.read("elsewhere/weekly_ai_newsletter.md"),
        "flag answer"
    );
    assert!(!fixture.sandbox.join("reports").exists());
}

#[test]
fn test_log_file_is_written() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["run", "newsletter", "--backend", "mock", "--mock-response", "x"])
        .env("CREWLINE_LOG_FILE", sandbox.join("logs/crewline.log"))
        .assert()
        .success();

    let entries = fs::read_dir(sandbox.join("logs")).unwrap().count();
    assert!(entries >= 1);
}
