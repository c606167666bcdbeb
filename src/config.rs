//! Configuration system for crewline
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (`CREWLINE_*` prefix, plus `GROQ_API_KEY` / `SERPER_API_KEY`)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! API keys have no embedded defaults. They are only ever read from the
//! environment (or an explicit config value) and checked before any network
//! call is made.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::BackendType;
use crate::error::{Error, Result};
use crate::tools::MAX_SEARCH_RESULTS;

/// Environment variable holding the LLM API key
pub const LLM_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable holding the search API key
pub const SEARCH_API_KEY_ENV: &str = "SERPER_API_KEY";

/// Main crewline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewlineConfig {
    /// LLM API settings
    pub llm: LlmSettings,

    /// Web search tool settings
    pub search: SearchSettings,

    /// Pipeline execution settings
    pub pipeline: PipelineSettings,

    /// Output artifact settings
    pub output: OutputSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// OpenAI-compatible LLM API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Which backend executes chat requests
    pub backend: BackendType,

    /// API base URL
    pub base_url: String,

    /// API key. Normally supplied through GROQ_API_KEY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries on rate limits, 5xx and connection errors (0 = fail fast)
    pub max_retries: u32,

    /// Fixed reply used by the mock backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_response: Option<String>,
}

/// Serper web search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Search API base URL
    pub base_url: String,

    /// API key. Normally supplied through SERPER_API_KEY.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Number of organic results requested per query
    pub num_results: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Pipeline execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Maximum tool-call rounds per task before a final answer is forced
    pub max_tool_rounds: u32,

    /// Log each task's output as it completes, regardless of persona flags
    pub verbose: bool,
}

/// Output artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory the output artifact is written into
    pub dir: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: BackendType::OpenAi,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama3-8b-8192".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 0,
            mock_response: None,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://google.serper.dev".to_string(),
            api_key: None,
            num_results: 5,
            timeout_secs: 30,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 5,
            verbose: false,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl CrewlineConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = Self::from_toml(&content)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            PathBuf::from("crewline.toml"),
            dirs::config_dir()
                .map(|p| p.join("crewline").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".crewline").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Provider keys use the names the hosted services document
        if let Some(val) = non_empty_env(LLM_API_KEY_ENV) {
            self.llm.api_key = Some(val);
        }
        if let Some(val) = non_empty_env(SEARCH_API_KEY_ENV) {
            self.search.api_key = Some(val);
        }

        // LLM settings
        if let Some(val) = non_empty_env("CREWLINE_BACKEND") {
            if let Ok(backend) = val.parse() {
                self.llm.backend = backend;
            }
        }
        if let Some(val) = non_empty_env("CREWLINE_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Some(val) = non_empty_env("CREWLINE_LLM_MODEL") {
            self.llm.model = val;
        }
        if let Some(val) = non_empty_env("CREWLINE_LLM_TEMPERATURE") {
            if let Ok(n) = val.parse() {
                self.llm.temperature = n;
            }
        }
        if let Some(val) = non_empty_env("CREWLINE_LLM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.llm.timeout_secs = n;
            }
        }
        if let Some(val) = non_empty_env("CREWLINE_LLM_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                self.llm.max_retries = n;
            }
        }

        // Search settings
        if let Some(val) = non_empty_env("CREWLINE_SEARCH_BASE_URL") {
            self.search.base_url = val;
        }
        if let Some(val) = non_empty_env("CREWLINE_SEARCH_NUM_RESULTS") {
            if let Ok(n) = val.parse() {
                self.search.num_results = n;
            }
        }

        // Pipeline settings
        if let Some(val) = non_empty_env("CREWLINE_MAX_TOOL_ROUNDS") {
            if let Ok(n) = val.parse() {
                self.pipeline.max_tool_rounds = n;
            }
        }
        if let Some(val) = non_empty_env("CREWLINE_VERBOSE") {
            self.pipeline.verbose = parse_bool(&val);
        }

        // Output settings
        if let Some(val) = non_empty_env("CREWLINE_OUTPUT_DIR") {
            self.output.dir = val;
        }

        // Logging settings
        if let Some(val) = non_empty_env("CREWLINE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = non_empty_env("CREWLINE_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = non_empty_env("CREWLINE_LOG_JSON") {
            self.logging.json_format = parse_bool(&val);
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.output.dir = expand_path(&self.output.dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validate_http_url("llm.base_url", &self.llm.base_url)?;
        validate_http_url("search.base_url", &self.search.base_url)?;

        if self.llm.model.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "llm.model",
                "Model identifier cannot be empty",
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config_field_invalid(
                "llm.temperature",
                "temperature must be between 0.0 and 2.0",
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "llm.timeout_secs",
                "timeout_secs must be greater than zero",
            ));
        }

        if !(1..=MAX_SEARCH_RESULTS).contains(&self.search.num_results) {
            return Err(Error::config_field_invalid(
                "search.num_results",
                format!("num_results must be between 1 and {}", MAX_SEARCH_RESULTS),
            ));
        }

        if self.search.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "search.timeout_secs",
                "timeout_secs must be greater than zero",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// The LLM API key, or a configuration error naming the variable to set
    pub fn require_llm_key(&self) -> Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(Error::MissingEnv {
                var: LLM_API_KEY_ENV,
                purpose: "LLM API key",
            })
    }

    /// The search API key, or a configuration error naming the variable to set
    pub fn require_search_key(&self) -> Result<&str> {
        self.search
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(Error::MissingEnv {
                var: SEARCH_API_KEY_ENV,
                purpose: "web search API key",
            })
    }

    /// Apply command-line values, which win over file and environment
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(backend) = overrides.backend {
            self.llm.backend = backend;
        }
        if let Some(model) = overrides.model {
            self.llm.model = model;
        }
        if overrides.mock_response.is_some() {
            self.llm.mock_response = overrides.mock_response;
        }
        if let Some(dir) = overrides.output_dir {
            self.output.dir = dir;
        }
        if let Some(rounds) = overrides.max_tool_rounds {
            self.pipeline.max_tool_rounds = rounds;
        }

        self.expand_paths();
        self.validate()
    }

    /// Get the output directory as a PathBuf
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output.dir)
    }

    /// Copy of this configuration with API keys masked, for display
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if shown.llm.api_key.is_some() {
            shown.llm.api_key = Some("********".to_string());
        }
        if shown.search.api_key.is_some() {
            shown.search.api_key = Some("********".to_string());
        }
        shown
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::config_field_invalid(field, format!("Invalid URL '{}': {}", value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::config_field_invalid(
            field,
            format!("URL must use http or https, got '{}'", other),
        )),
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location for `config init`
fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".crewline")
        .join("config.toml")
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<BackendType>,
    pub model: Option<String>,
    pub mock_response: Option<String>,
    pub output_dir: Option<String>,
    pub max_tool_rounds: Option<u32>,
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent)?;
    }

    fs::write(&config_path, DEFAULT_CONFIG).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::IoWrite {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Default configuration content with comments
const DEFAULT_CONFIG: &str = r#"# crewline configuration
#
# API keys are read from the environment (GROQ_API_KEY, SERPER_API_KEY)
# or from a .env file in the working directory. Do not commit them here.

[llm]
# Backend: "openai" (any OpenAI-compatible API) or "mock" (offline, deterministic)
backend = "openai"

# API base URL
base_url = "https://api.groq.com/openai/v1"

# Model identifier
model = "llama3-8b-8192"

# Sampling temperature
temperature = 0.0

# Request timeout in seconds
timeout_secs = 120

# Retries on rate limits and server errors (0 = fail on first error)
max_retries = 0

[search]
# Serper API base URL
base_url = "https://google.serper.dev"

# Organic results per query (1-20)
num_results = 5

# Request timeout in seconds
timeout_secs = 30

[pipeline]
# Tool-call rounds per task before a final answer is forced
max_tool_rounds = 5

# Log every task output as it completes
verbose = false

[output]
# Directory the crew's output file is written into
dir = "."

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.crewline/logs/crewline.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#;
