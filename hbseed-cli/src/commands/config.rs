//! `hbseed config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use hbseed_core::config::{HbseedConfig, SeedRow};

use super::{ConfigOverrides, config_source, load_config};
use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const SECTIONS: &str = "general, connection, table, batch, scan, rows";

/// Execute the `config` command.
pub fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, overrides, writer),
        ConfigAction::Show { section } => {
            execute_show(config_path, overrides, section.as_deref(), writer)
        }
    }
}

/// Loads the configuration and reports whether it is usable.
///
/// # Errors
///
/// Returns `CliError::Config` after rendering the report when validation fails.
fn execute_validate(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = config_source(config_path);
    info!(source = %source, "validating configuration");

    let report = match load_config(config_path, overrides) {
        Ok(_) => ConfigValidationReport {
            source,
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Prints the effective configuration (file + env overrides + flags + defaults).
fn execute_show(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    section: Option<&str>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = config_source(config_path);
    info!(source = %source, "loading configuration");

    let config = load_config(config_path, overrides)?;
    let report = build_config_report(&config, source, section)?;

    writer.render(&report)?;

    Ok(())
}

/// `[[rows]]` cannot be serialized as a TOML document on its own.
#[derive(Serialize)]
struct RowsSection<'a> {
    rows: &'a [SeedRow],
}

fn build_config_report(
    config: &HbseedConfig,
    source: String,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section {
        None => to_toml(config),
        Some("general") => to_toml(&config.general),
        Some("connection") => to_toml(&config.connection),
        Some("table") => to_toml(&config.table),
        Some("batch") => to_toml(&config.batch),
        Some("scan") => to_toml(&config.scan),
        Some("rows") => to_toml(&RowsSection { rows: &config.rows }),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: {SECTIONS})"
            )));
        }
    };

    Ok(ConfigReport {
        source,
        section: section.map(str::to_owned),
        config_toml,
    })
}

fn to_toml<T: Serialize + ?Sized>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {e})"))
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    /// None = full config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
