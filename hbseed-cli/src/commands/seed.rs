//! `hbseed seed` command handler

use std::io::Write;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use hbseed_core::client::HbaseClient;
use hbseed_core::config::HbseedConfig;
use hbseed_core::seed::{self, SeedEvent, SeedPlan};
use hbseed_core::table::BatchStats;

use super::{RowEntry, with_client};
use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `seed` command.
///
/// Text output is written while the flow runs, so a failure after the
/// table step still leaves the notice on stdout. JSON is rendered once the
/// run completes.
pub fn execute(config: &HbseedConfig, writer: &OutputWriter) -> Result<(), CliError> {
    match writer.format() {
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            with_client(&config.connection, |client| {
                build_seed_report(client, config, &mut out)
            })?;
        }
        OutputFormat::Json => {
            let report = with_client(&config.connection, |client| {
                build_seed_report(client, config, &mut std::io::sink())
            })?;
            writer.render(&report)?;
        }
    }

    Ok(())
}

/// Runs the seed flow through `client`, writing the text output to `live`
/// step by step, and returns the collected report.
///
/// An already existing table is reported, not treated as a failure.
pub fn build_seed_report<C: HbaseClient + ?Sized>(
    client: &mut C,
    config: &HbseedConfig,
    live: &mut dyn Write,
) -> Result<SeedReport, CliError> {
    let plan = SeedPlan::from_config(config);
    info!(table = %plan.table, rows = plan.rows.len(), "seeding table");

    let outcome = seed::run_with(client, &plan, |event| -> Result<(), CliError> {
        match event {
            SeedEvent::TableReady { created, .. } => {
                if !created {
                    write_exists_notice(live)?;
                }
            }
            SeedEvent::Written(_) => write_header(live, &plan.table)?,
            SeedEvent::Row(row) => writeln!(live, "{row}")?,
        }
        live.flush()?;
        Ok(())
    })?;

    Ok(SeedReport {
        table: outcome.table,
        created: outcome.created,
        written: outcome.written,
        rows: outcome.rows.iter().map(RowEntry::from).collect(),
    })
}

fn write_exists_notice(w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "{}", "Table already exists".yellow())
}

fn write_header(w: &mut dyn Write, table: &str) -> std::io::Result<()> {
    writeln!(w, "Data in table {table}:")
}

#[derive(Debug, Serialize)]
pub struct SeedReport {
    pub table: String,
    /// False when the table already existed
    pub created: bool,
    pub written: BatchStats,
    pub rows: Vec<RowEntry>,
}

impl Render for SeedReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if !self.created {
            write_exists_notice(w)?;
        }
        write_header(w, &self.table)?;
        for row in &self.rows {
            writeln!(w, "{}", row.line)?;
        }

        Ok(())
    }
}
