//! `cabmap` binary entry point
//!
//! Parses arguments, initializes logging, loads configuration, and hands
//! off to the command handlers in the library.

use anyhow::Result;
use cabmap_cli::{BuildArgs, InspectArgs, OutputFormat, QueryCommands, commands, config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cabmap",
    about = "Build and query CAB location indexes for asset bundle wrapper files",
    version,
    long_about = "Indexes every CAB packed in a set of wrapper files, records which wrapper and bundle offset it lives in, and expands request lists with the wrappers their CABs depend on."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CABMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Index file to build or query
    #[arg(short, long, global = true, env = "CABMAP_INDEX")]
    index: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from wrapper files
    Build(BuildArgs),

    #[command(flatten)]
    Query(QueryCommands),

    /// List the bundles and entries of one wrapper file
    Inspect(InspectArgs),

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(Level::from(cli.log_level).as_str().to_ascii_lowercase())
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let index_config = config::resolve_config(cli.config.as_deref(), cli.index.as_deref())?;

    match cli.command {
        Commands::Build(args) => commands::build::handle(args, &index_config, cli.format)?,
        Commands::Query(cmd) => commands::query::handle(cmd, &index_config, cli.format)?,
        Commands::Inspect(args) => commands::inspect::handle(args, cli.format)?,
        Commands::Config => {
            if cli.format.is_json() {
                cabmap_cli::output::print_json(&index_config, cli.format)?;
            } else {
                print!("{}", config::to_toml(&index_config)?);
            }
        }
    }

    Ok(())
}
