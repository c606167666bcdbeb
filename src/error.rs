//! Error types for crewline
//!
//! Every failure aborts the run. Errors carry:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for the CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for crewline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    MissingEnv = 103,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoNotFound = 202,
    IoPermission = 203,
    CsvWrite = 204,

    // Crew definition errors (3xx)
    CrewNotFound = 300,
    CrewParseError = 301,
    PersonaNotFound = 302,
    PersonaDuplicate = 303,
    CrewEmpty = 304,
    PlaceholderUnresolved = 305,
    DelegationUnsupported = 306,

    // LLM API errors (4xx)
    ApiConnection = 400,
    ApiAuthentication = 401,
    ApiRateLimited = 402,
    ApiStatus = 403,
    ApiMalformed = 404,

    // Tool errors (5xx)
    ToolFailed = 500,
    ToolUnknown = 501,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// A required environment variable is not set
    #[error("Required environment variable {var} is not set ({purpose})")]
    MissingEnv { var: &'static str, purpose: &'static str },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export error
    #[error("Failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Crew Definition Errors
    // ─────────────────────────────────────────────────────────────

    /// No bundled crew with this name
    #[error("Unknown crew '{name}'")]
    CrewNotFound { name: String },

    /// Crew TOML could not be parsed
    #[error("Failed to parse crew '{name}': {message}")]
    CrewParse { name: String, message: String },

    /// A task references a persona that is not in the roster
    #[error("Task {task_index} references unknown persona '{persona}'")]
    PersonaNotFound { task_index: usize, persona: String },

    /// Two personas share a name
    #[error("Persona '{name}' is declared more than once")]
    PersonaDuplicate { name: String },

    /// Crew has no tasks
    #[error("Crew '{name}' declares no tasks")]
    CrewEmpty { name: String },

    /// A `{placeholder}` has no matching input
    #[error("Unresolved placeholder '{{{key}}}' in {location}")]
    PlaceholderUnresolved { key: String, location: String },

    /// Delegation between personas is not supported
    #[error("Persona '{persona}' requests delegation, which is not supported")]
    DelegationUnsupported { persona: String },

    // ─────────────────────────────────────────────────────────────
    // LLM API Errors
    // ─────────────────────────────────────────────────────────────

    /// Could not reach the API
    #[error("Failed to reach {url}: {message}")]
    ApiConnection { url: String, message: String },

    /// API rejected the credentials
    #[error("API authentication failed ({status}): {body}")]
    ApiAuthentication { status: u16, body: String },

    /// API rate limit hit
    #[error("API rate limit exceeded: {body}")]
    ApiRateLimited { body: String },

    /// API answered with a non-success status
    #[error("API error {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// API answered with something we could not interpret
    #[error("Malformed API response: {message}")]
    ApiMalformed { message: String },

    // ─────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────

    /// Tool execution failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// Model asked for a tool that was not offered
    #[error("Model requested unknown tool '{tool}'")]
    ToolUnknown { tool: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::MissingEnv { .. } => ErrorCode::MissingEnv,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Csv { .. } => ErrorCode::CsvWrite,
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::CrewNotFound { .. } => ErrorCode::CrewNotFound,
            Error::CrewParse { .. } => ErrorCode::CrewParseError,
            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::PersonaDuplicate { .. } => ErrorCode::PersonaDuplicate,
            Error::CrewEmpty { .. } => ErrorCode::CrewEmpty,
            Error::PlaceholderUnresolved { .. } => ErrorCode::PlaceholderUnresolved,
            Error::DelegationUnsupported { .. } => ErrorCode::DelegationUnsupported,

            Error::ApiConnection { .. } => ErrorCode::ApiConnection,
            Error::ApiAuthentication { .. } => ErrorCode::ApiAuthentication,
            Error::ApiRateLimited { .. } => ErrorCode::ApiRateLimited,
            Error::ApiStatus { .. } => ErrorCode::ApiStatus,
            Error::ApiMalformed { .. } => ErrorCode::ApiMalformed,

            Error::ToolFailed { .. } => ErrorCode::ToolFailed,
            Error::ToolUnknown { .. } => ErrorCode::ToolUnknown,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether a bounded retry could succeed (only consulted when
    /// `max_retries > 0`)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ApiConnection { .. } | Error::ApiRateLimited { .. }
        ) || matches!(self, Error::ApiStatus { status, .. } if *status >= 500)
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => {
                Some("Run 'crewline config init' to create a default configuration file.")
            }
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'crewline config validate' to see details.",
            ),
            Error::MissingEnv { .. } => Some(
                "Export the variable in your shell or add it to a .env file in the working directory.",
            ),
            Error::CrewNotFound { .. } => {
                Some("Run 'crewline list' to see the bundled crews, or pass --crew-file.")
            }
            Error::PersonaNotFound { .. } => {
                Some("Every [[task]] entry must name a persona declared under [[persona]].")
            }
            Error::PlaceholderUnresolved { .. } => {
                Some("Add the key to the crew's [inputs] table or pass --input key=value.")
            }
            Error::ApiAuthentication { .. } => Some("Verify GROQ_API_KEY (or llm.api_key)."),
            Error::ApiRateLimited { .. } => Some(
                "Wait and try again, or raise llm.max_retries to retry automatically.",
            ),
            Error::ApiConnection { .. } => {
                Some("Check your network connection and the configured llm.base_url.")
            }
            Error::ToolFailed { .. } => Some("Verify SERPER_API_KEY and search.base_url."),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Error::ConfigValidation { field: Some(field), .. } = self {
            output.push_str(&format!("  Field: {}\n", field));
        }

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a malformed response error
    pub fn api_malformed(message: impl Into<String>) -> Self {
        Error::ApiMalformed {
            message: message.into(),
        }
    }

    /// Create a tool failure
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
