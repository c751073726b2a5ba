//! `hbseed describe` command handler

use std::io::Write;

use serde::Serialize;

use hbseed_core::client::HbaseClient;
use hbseed_core::config::HbseedConfig;
use hbseed_core::types::ColumnFamily;

use super::with_client;
use crate::cli::DescribeArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `describe` command.
pub fn execute(
    args: DescribeArgs,
    config: &HbseedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let table = args.table.unwrap_or_else(|| config.table.name.clone());

    let report = with_client(&config.connection, |client| {
        build_describe_report(client, &table)
    })?;

    writer.render(&report)?;

    Ok(())
}

pub fn build_describe_report<C: HbaseClient + ?Sized>(
    client: &mut C,
    table: &str,
) -> Result<DescribeReport, CliError> {
    let families = client.column_families(table)?.into_values().collect();

    Ok(DescribeReport {
        table: table.to_owned(),
        families,
    })
}

#[derive(Debug, Serialize)]
pub struct DescribeReport {
    pub table: String,
    pub families: Vec<ColumnFamily>,
}

impl Render for DescribeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Table {}", self.table.bold())?;
        writeln!(w)?;
        writeln!(
            w,
            "  {:<24} {:>8} {:<12} {:<8} {:<10} {:<11} {:>10}",
            "FAMILY", "VERSIONS", "COMPRESSION", "BLOOM", "IN_MEMORY", "BLOCKCACHE", "TTL"
        )?;
        for family in &self.families {
            let versions = family
                .max_versions
                .map_or_else(|| "-".to_owned(), |v| v.to_string());
            let ttl = family
                .time_to_live
                .map_or_else(|| "-".to_owned(), |t| t.to_string());
            writeln!(
                w,
                "  {:<24} {:>8} {:<12} {:<8} {:<10} {:<11} {:>10}",
                family.name,
                versions,
                family.compression.as_deref().unwrap_or("-"),
                family.bloom_filter_type.as_deref().unwrap_or("-"),
                family.in_memory,
                family.block_cache_enabled,
                ttl,
            )?;
        }

        Ok(())
    }
}
