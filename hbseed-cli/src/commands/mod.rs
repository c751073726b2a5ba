//! Command handlers -- one module per subcommand
//!
//! Every handler that talks to HBase splits into a `build_*` function,
//! generic over [`HbaseClient`] so tests can drive it with a `MemoryClient`,
//! and an `execute` function that opens the Thrift connection and renders.

pub mod config;
pub mod describe;
pub mod scan;
pub mod seed;
pub mod tables;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use hbseed_core::client::HbaseClient;
use hbseed_core::config::{ConnectionConfig, DEFAULT_CONFIG_FILE, HbseedConfig};
use hbseed_core::error::HbseedError;
use hbseed_core::types::Row;
use hbseed_thrift::ThriftClient;

use crate::cli::Cli;
use crate::error::CliError;

/// Settings given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            host: cli.host.clone(),
            port: cli.port,
            log_level: cli.log_level.clone(),
        }
    }

    pub fn apply(&self, config: &mut HbseedConfig) {
        if let Some(host) = &self.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// The file to read: the explicit `--config`, else `./hbseed.toml` when it
/// exists, else none (defaults plus environment).
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}

/// Human-readable name of where the configuration came from.
pub fn config_source(path: Option<&Path>) -> String {
    path.map_or_else(
        || "defaults".to_owned(),
        |path| path.display().to_string(),
    )
}

/// Loads, overrides and validates the configuration.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<HbseedConfig, HbseedError> {
    let mut config = match path {
        Some(path) => HbseedConfig::load(path)?,
        None => HbseedConfig::from_env()?,
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Connects, runs `f`, and closes the connection whatever `f` returned.
pub fn with_client<T>(
    config: &ConnectionConfig,
    f: impl FnOnce(&mut ThriftClient) -> Result<T, CliError>,
) -> Result<T, CliError> {
    let mut client = ThriftClient::connect(config)?;
    info!(addr = %config.addr(), "connected to thrift gateway");

    let result = f(&mut client);

    if let Err(e) = client.close() {
        warn!(error = %e, "failed to close connection");
    }
    result
}

/// Row payload shared by `seed` and `scan`.
#[derive(Debug, Serialize)]
pub struct RowEntry {
    pub key: String,
    pub columns: BTreeMap<String, String>,
    /// `<key> {family:qualifier=value, ...}`
    #[serde(skip)]
    pub line: String,
}

impl From<&Row> for RowEntry {
    fn from(row: &Row) -> Self {
        Self {
            key: row.key_lossy().into_owned(),
            columns: row.text_map(),
            line: row.to_string(),
        }
    }
}

/// Scans `table` through `client` and collects the rows.
pub fn collect_rows<C: HbaseClient + ?Sized>(
    client: &mut C,
    table: &str,
    spec: hbseed_core::types::ScanSpec,
) -> Result<Vec<RowEntry>, CliError> {
    let mut table = hbseed_core::table::Table::new(client, table);
    let mut rows = Vec::new();
    for row in table.scan(spec)? {
        rows.push(RowEntry::from(&row?));
    }
    Ok(rows)
}
