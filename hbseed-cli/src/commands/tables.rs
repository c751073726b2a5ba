//! `hbseed tables` command handler

use std::io::Write;

use serde::Serialize;

use hbseed_core::client::HbaseClient;
use hbseed_core::config::HbseedConfig;

use super::with_client;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `tables` command.
pub fn execute(config: &HbseedConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let report = with_client(&config.connection, |client| {
        build_tables_report(client, &config.table.name)
    })?;

    writer.render(&report)?;

    Ok(())
}

pub fn build_tables_report<C: HbaseClient + ?Sized>(
    client: &mut C,
    configured: &str,
) -> Result<TablesReport, CliError> {
    let mut names = client.table_names()?;
    names.sort();

    let tables = names
        .into_iter()
        .map(|name| TableEntry {
            configured: name == configured,
            name,
        })
        .collect();

    Ok(TablesReport { tables })
}

#[derive(Debug, Serialize)]
pub struct TablesReport {
    pub tables: Vec<TableEntry>,
}

#[derive(Debug, Serialize)]
pub struct TableEntry {
    pub name: String,
    /// Whether this is the table named in `[table]`
    pub configured: bool,
}

impl Render for TablesReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.tables.is_empty() {
            writeln!(w, "No tables found.")?;
            return Ok(());
        }

        writeln!(w, "Tables ({}):", self.tables.len())?;
        for table in &self.tables {
            if table.configured {
                writeln!(w, "  {} {}", table.name.bold(), "(configured)".dimmed())?;
            } else {
                writeln!(w, "  {}", table.name)?;
            }
        }

        Ok(())
    }
}
