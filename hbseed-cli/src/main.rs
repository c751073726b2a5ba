//! hbseed -- seed and inspect an HBase table through the Thrift gateway.
//!
//! Exit codes follow [`CliError::exit_code`]. Command output goes to stdout,
//! logs and errors to stderr.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::info;

use hbseed_core::config::{GeneralConfig, HbseedConfig};

use cli::{Cli, Commands};
use commands::ConfigOverrides;
use error::CliError;
use output::OutputWriter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let overrides = ConfigOverrides::from_cli(&cli);
    let config_path = commands::config_path(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Seed) {
        Commands::Config(args) => {
            // The configuration under inspection may be broken; log with defaults.
            let mut general = GeneralConfig::default();
            if let Some(level) = &overrides.log_level {
                general.log_level = level.clone();
            }
            init_logging(&general);
            commands::config::execute(args, config_path.as_deref(), &overrides, &writer)
        }
        Commands::Seed => {
            let config = prepare(config_path, &overrides)?;
            commands::seed::execute(&config, &writer)
        }
        Commands::Scan(args) => {
            let config = prepare(config_path, &overrides)?;
            commands::scan::execute(args, &config, &writer)
        }
        Commands::Tables => {
            let config = prepare(config_path, &overrides)?;
            commands::tables::execute(&config, &writer)
        }
        Commands::Describe(args) => {
            let config = prepare(config_path, &overrides)?;
            commands::describe::execute(args, &config, &writer)
        }
    }
}

/// Loads the configuration and starts logging with its `[general]` section.
fn prepare(
    config_path: Option<PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<HbseedConfig, CliError> {
    let config = commands::load_config(config_path.as_deref(), overrides)?;
    init_logging(&config.general);

    info!(
        source = %commands::config_source(config_path.as_deref()),
        addr = %config.connection.addr(),
        table = %config.table.name,
        "configuration loaded"
    );
    Ok(config)
}

fn init_logging(general: &GeneralConfig) {
    if let Err(e) = logging::init_tracing(general) {
        eprintln!("{} {e}", "warning:".yellow().bold());
    }
}
