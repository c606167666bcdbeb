//! crewline - run LLM persona crews through a sequential pipeline
//!
//! This is the main entry point for the crewline binary. A crew's tasks are
//! executed in order against an OpenAI-compatible chat API and the final
//! result is written to a Markdown or CSV file.

mod backend;
mod cli;
mod config;
mod crew;
mod error;
mod logging;
mod output;
mod persona;
mod pipeline;
mod tools;
mod types;

use std::io::{self, Write};

use clap::Parser;
use tracing::{debug, error, info};

use crate::backend::{BackendFactory, BackendType};
use crate::cli::{Cli, Commands, ConfigSubcommand, RunArgs};
use crate::config::{CrewlineConfig, Overrides};
use crate::crew::{Crew, CrewDefinition, CrewRegistry};
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use crate::pipeline::{PipelineRunner, RunnerConfig, SequentialRunner};
use crate::tools::ToolSet;

fn main() {
    // .env is read before anything consults the environment
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Run(args) => run_crew(args, verbose, quiet, dotenv.is_ok()),
        Commands::List => list_crews(),
        Commands::Show { crew, crew_file } => show_crew(crew.as_deref(), crew_file.as_deref()),
        Commands::Config { subcommand } => handle_config_command(subcommand),
    };

    if let Err(e) = result {
        error!("{}", e.format_for_log());
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

/// Run a crew end to end
fn run_crew(args: RunArgs, verbose: u8, quiet: bool, dotenv_loaded: bool) -> Result<()> {
    let mut config = CrewlineConfig::load(args.config.as_deref())?;
    config.apply_overrides(Overrides {
        backend: args.backend,
        model: args.model,
        mock_response: args.mock_response,
        output_dir: args.output_dir,
        max_tool_rounds: args.max_tool_rounds,
    })?;

    // The guards must be kept alive for the lifetime of the run
    let _log_guards = logging::init_logging(&config.logging, verbose, quiet)?;
    debug!(dotenv = dotenv_loaded, "Environment loaded");

    let crew = load_crew(args.crew.as_deref(), args.crew_file.as_deref())?
        .with_inputs(args.inputs)
        .validate()?;

    // Credentials are checked here, before any network call
    let backend = BackendFactory::create(&config)?;
    let tools = match config.llm.backend {
        BackendType::OpenAi => ToolSet::for_kinds(crew.required_tools().iter(), &config)?,
        // The mock never calls tools, so none are offered
        BackendType::Mock => ToolSet::new(),
    };

    print_banner(&crew)?;

    let runner = SequentialRunner::new(RunnerConfig::from(&config.pipeline), backend, tools);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;
    let result = runtime.block_on(runner.kickoff(&crew))?;

    let writer = OutputWriter::new(config.output_dir());
    let path = writer.write(&result, &crew.output)?;
    writer.announce(&result, &path, &mut io::stdout().lock())?;

    info!(
        crew = %crew.name,
        run_id = %result.run_id,
        path = %path.display(),
        prompt_tokens = result.usage.prompt_tokens,
        completion_tokens = result.usage.completion_tokens,
        "Run complete"
    );
    Ok(())
}

fn load_crew(name: Option<&str>, file: Option<&std::path::Path>) -> Result<CrewDefinition> {
    let registry = CrewRegistry::new();
    match (name, file) {
        (_, Some(path)) => registry.load_file(path),
        (Some(name), None) => registry.get(name),
        (None, None) => Err(Error::CrewNotFound {
            name: String::new(),
        }),
    }
}

/// Title and intro, printed before the first task
fn print_banner(crew: &Crew) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", crew.title)?;
    if !crew.intro.trim().is_empty() {
        writeln!(out, "\n{}\n", crew.intro.trim_end())?;
    }
    out.flush()?;
    Ok(())
}

/// Print the bundled crews
fn list_crews() -> Result<()> {
    let listings = CrewRegistry::new().list_available()?;
    let mut out = io::stdout().lock();

    writeln!(
        out,
        "{:<18} {:>8} {:>6}  {:<9} {:<34} TITLE",
        "CREW", "PERSONAS", "TASKS", "FORMAT", "OUTPUT"
    )?;
    for l in listings {
        writeln!(
            out,
            "{:<18} {:>8} {:>6}  {:<9} {:<34} {}",
            l.name,
            l.personas,
            l.tasks,
            l.format.to_string(),
            l.file,
            l.title
        )?;
    }
    Ok(())
}

/// Print a crew's personas and tasks
fn show_crew(name: Option<&str>, file: Option<&std::path::Path>) -> Result<()> {
    let crew = load_crew(name, file)?.validate()?;
    let mut out = io::stdout().lock();

    writeln!(out, "{} ({})", crew.title, crew.name)?;
    writeln!(out, "Output: {} [{}]", crew.output.file, crew.output.format)?;

    writeln!(out, "\nPersonas:")?;
    for persona in crew.roster.iter() {
        let tools: Vec<_> = persona.tools.iter().map(|t| t.name()).collect();
        writeln!(out, "  {} - {}", persona.name, persona.role)?;
        writeln!(out, "      goal: {}", persona.goal)?;
        if !tools.is_empty() {
            writeln!(out, "      tools: {}", tools.join(", "))?;
        }
    }

    writeln!(out, "\nTasks:")?;
    for task in &crew.tasks {
        let persona = crew.persona(task)?;
        let marker = if task.export_step { " [export]" } else { "" };
        writeln!(out, "  {}. [{}]{} {}", task.number, persona.role, marker, task.description)?;
        writeln!(out, "      expected: {}", task.expected_output)?;
    }
    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = CrewlineConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg.redacted())?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            CrewlineConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
