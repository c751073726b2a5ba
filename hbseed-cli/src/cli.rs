//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// hbseed -- seed and inspect an HBase table through the Thrift gateway.
///
/// Without a command, runs `seed`.
#[derive(Parser, Debug)]
#[command(name = "hbseed", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file (default: ./hbseed.toml when present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Override the Thrift gateway host.
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Override the Thrift gateway port.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the table if needed, write the configured rows, print the table.
    Seed,

    /// Print the rows of the table.
    Scan(ScanArgs),

    /// List the tables on the cluster.
    Tables,

    /// Show the column families of the table.
    Describe(DescribeArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Print rows without writing anything.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Stop after this many rows.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Restrict to a family or family:qualifier (repeatable).
    #[arg(long = "column")]
    pub columns: Vec<String>,

    /// Table to scan instead of the configured one.
    #[arg(long)]
    pub table: Option<String>,
}

// ---- describe ----

/// Show a table's schema.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Table to describe instead of the configured one.
    pub table: Option<String>,
}

// ---- config ----

/// Manage hbseed configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, connection, table, batch, scan, rows).
        #[arg(long)]
        section: Option<String>,
    },
}
