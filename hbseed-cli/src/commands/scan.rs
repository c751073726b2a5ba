//! `hbseed scan` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use hbseed_core::client::HbaseClient;
use hbseed_core::config::HbseedConfig;
use hbseed_core::types::ScanSpec;

use super::{RowEntry, collect_rows, with_client};
use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub fn execute(
    args: ScanArgs,
    config: &HbseedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (table, spec) = scan_target(&args, config);

    let report = with_client(&config.connection, |client| {
        build_scan_report(client, &table, spec)
    })?;

    writer.render(&report)?;

    Ok(())
}

/// Table name and scan settings: the `[scan]` section with command-line
/// flags layered on top. `--limit 0` means no limit, like `scan.limit = 0`.
fn scan_target(args: &ScanArgs, config: &HbseedConfig) -> (String, ScanSpec) {
    let table = args
        .table
        .clone()
        .unwrap_or_else(|| config.table.name.clone());

    let mut spec = config.scan.spec();
    if let Some(limit) = args.limit {
        spec.limit = (limit > 0).then_some(limit);
    }
    if !args.columns.is_empty() {
        spec.columns = args.columns.clone();
    }
    (table, spec)
}

pub fn build_scan_report<C: HbaseClient + ?Sized>(
    client: &mut C,
    table: &str,
    spec: ScanSpec,
) -> Result<ScanReport, CliError> {
    info!(table, limit = ?spec.limit, columns = spec.columns.len(), "scanning table");

    let rows = collect_rows(client, table, spec)?;

    Ok(ScanReport {
        table: table.to_owned(),
        count: rows.len(),
        rows,
    })
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub table: String,
    pub count: usize,
    pub rows: Vec<RowEntry>,
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Data in table {}:", self.table)?;
        for row in &self.rows {
            writeln!(w, "{}", row.line)?;
        }
        writeln!(w, "{}", format!("({} rows)", self.count).dimmed())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbseed_core::memory::MemoryClient;
    use hbseed_core::seed::{self, SeedPlan};

    fn seeded() -> MemoryClient {
        let mut client = MemoryClient::new();
        seed::run(&mut client, &SeedPlan::from_config(&HbseedConfig::default()))
            .expect("seed should succeed");
        client
    }

    fn args(limit: Option<usize>, columns: &[&str], table: Option<&str>) -> ScanArgs {
        ScanArgs {
            limit,
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            table: table.map(str::to_owned),
        }
    }

    #[test]
    fn test_scan_target_uses_config_by_default() {
        let config = HbseedConfig::default();
        let (table, spec) = scan_target(&args(None, &[], None), &config);
        assert_eq!(table, "employees1");
        assert_eq!(spec, config.scan.spec());
    }

    #[test]
    fn test_scan_target_flags_override_config() {
        let mut config = HbseedConfig::default();
        config.scan.limit = 10;
        let (table, spec) = scan_target(&args(Some(0), &["job_data"], Some("other")), &config);
        assert_eq!(table, "other");
        assert_eq!(spec.limit, None, "--limit 0 lifts the configured limit");
        assert_eq!(spec.columns, vec!["job_data"]);
    }

    #[test]
    fn test_scan_all_rows() {
        let mut client = seeded();
        let report =
            build_scan_report(&mut client, "employees1", ScanSpec::default()).expect("scan");

        assert_eq!(report.count, 2);
        assert_eq!(client.open_scanners(), 0, "scanner closed after the scan");

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.starts_with("Data in table employees1:\n"));
        assert!(output.contains(
            "row1 {job_data:position=Engineer, personal_data:age=30, personal_data:name=John Doe}\n"
        ));
        assert!(output.contains("(2 rows)"));
    }

    #[test]
    fn test_scan_with_limit_and_column_filter() {
        let mut client = seeded();
        let spec = ScanSpec {
            limit: Some(1),
            columns: vec!["job_data".to_owned()],
            ..ScanSpec::default()
        };
        let report = build_scan_report(&mut client, "employees1", spec).expect("scan");

        assert_eq!(report.count, 1);
        assert_eq!(report.rows[0].line, "row1 {job_data:position=Engineer}");
        assert_eq!(client.open_scanners(), 0);
    }

    #[test]
    fn test_scan_missing_table_fails() {
        let mut client = MemoryClient::new();
        let err = build_scan_report(&mut client, "missing", ScanSpec::default())
            .expect_err("missing table");
        assert!(err.to_string().contains("missing"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_scan_report_json_serialization() {
        let mut client = seeded();
        let report =
            build_scan_report(&mut client, "employees1", ScanSpec::default()).expect("scan");
        let json = serde_json::to_string(&report).expect("JSON serialization should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("should parse JSON");

        assert_eq!(parsed["count"].as_u64(), Some(2));
        assert_eq!(parsed["rows"][0]["key"].as_str(), Some("row1"));
        assert_eq!(
            parsed["rows"][0]["columns"]["job_data:position"].as_str(),
            Some("Engineer")
        );
    }
}
