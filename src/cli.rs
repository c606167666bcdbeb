//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for crewline.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::backend::BackendType;

/// crewline - run LLM persona crews through a sequential pipeline
///
/// Each crew is a fixed set of personas and an ordered task list. Tasks run
/// one after another against an OpenAI-compatible API and the final result
/// is written to a Markdown or CSV file.
#[derive(Parser, Debug)]
#[command(name = "crewline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a crew and write its output file
    Run(RunArgs),

    /// List the bundled crews
    List,

    /// Show the personas and tasks of a crew
    Show {
        /// Bundled crew name
        #[arg(required_unless_present = "crew_file")]
        crew: Option<String>,

        /// Crew definition file instead of a bundled crew
        #[arg(long, conflicts_with = "crew")]
        crew_file: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Arguments for `crewline run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Bundled crew name (newsletter, neural-data, brain-knowledge)
    #[arg(required_unless_present = "crew_file")]
    pub crew: Option<String>,

    /// Crew definition file instead of a bundled crew
    #[arg(long, conflicts_with = "crew")]
    pub crew_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, env = "CREWLINE_CONFIG")]
    pub config: Option<String>,

    /// Directory the output file is written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Chat backend (openai or mock)
    #[arg(long)]
    pub backend: Option<BackendType>,

    /// Canned answer for the mock backend
    #[arg(long)]
    pub mock_response: Option<String>,

    /// Model identifier override
    #[arg(long)]
    pub model: Option<String>,

    /// Template input, may be repeated (e.g. --input project_name=neuro_db)
    #[arg(short, long = "input", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub inputs: Vec<(String, String)>,

    /// Tool-call rounds allowed per task
    #[arg(long)]
    pub max_tool_rounds: Option<u32>,
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration (secrets masked)
    Show {
        /// Path to configuration file
        #[arg(short, long, env = "CREWLINE_CONFIG")]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long, env = "CREWLINE_CONFIG")]
        config: Option<String>,
    },
}

/// Parse `KEY=VALUE`
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_bundled_crew() {
        let cli = Cli::parse_from(["crewline", "run", "newsletter"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.crew.as_deref(), Some("newsletter"));
                assert!(args.crew_file.is_none());
                assert!(args.backend.is_none());
                assert!(args.inputs.is_empty());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let cli = Cli::parse_from([
            "crewline",
            "run",
            "brain-knowledge",
            "--backend",
            "mock",
            "--mock-response",
            "ok",
            "--output-dir",
            "/tmp/out",
            "--input",
            "project_name=neuro_db",
            "-i",
            "topic=a=b",
            "--max-tool-rounds",
            "2",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.backend, Some(BackendType::Mock));
                assert_eq!(args.mock_response.as_deref(), Some("ok"));
                assert_eq!(args.output_dir.as_deref(), Some("/tmp/out"));
                assert_eq!(
                    args.inputs,
                    vec![
                        ("project_name".to_string(), "neuro_db".to_string()),
                        ("topic".to_string(), "a=b".to_string()),
                    ]
                );
                assert_eq!(args.max_tool_rounds, Some(2));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_crew_file() {
        let cli = Cli::parse_from(["crewline", "run", "--crew-file", "my-crew.toml"]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.crew.is_none());
                assert_eq!(args.crew_file, Some(PathBuf::from("my-crew.toml")));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_requires_crew() {
        assert!(Cli::try_parse_from(["crewline", "run"]).is_err());
        assert!(
            Cli::try_parse_from(["crewline", "run", "newsletter", "--crew-file", "x.toml"]).is_err()
        );
    }

    #[test]
    fn test_bad_backend_rejected() {
        assert!(Cli::try_parse_from(["crewline", "run", "newsletter", "--backend", "cuda"]).is_err());
    }

    #[test]
    fn test_bad_input_rejected() {
        assert!(Cli::try_parse_from(["crewline", "run", "newsletter", "--input", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["crewline", "run", "newsletter", "--input", "=x"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_flags() {
        let cli = Cli::parse_from(["crewline", "-vv", "list"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);

        let cli = Cli::parse_from(["crewline", "list", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_show() {
        let cli = Cli::parse_from(["crewline", "show", "neural-data"]);
        match cli.command {
            Commands::Show { crew, crew_file } => {
                assert_eq!(crew.as_deref(), Some("neural-data"));
                assert!(crew_file.is_none());
            }
            _ => panic!("Expected Show command"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["crewline", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
