//! [`HbaseClient`] over the Thrift1 `Hbase` service.
//!
//! # Examples
//!
//! ```no_run
//! use hbseed_core::client::HbaseClient;
//! use hbseed_core::config::ConnectionConfig;
//! use hbseed_thrift::ThriftClient;
//!
//! let mut client = ThriftClient::connect(&ConnectionConfig::default())?;
//! for table in client.table_names()? {
//!     println!("{table}");
//! }
//! client.close()?;
//! # Ok::<(), hbseed_core::error::HbaseError>(())
//! ```

use std::collections::BTreeMap;

use hbase_thrift::hbase::THbaseSyncClient;
use hbseed_core::client::HbaseClient;
use hbseed_core::config::ConnectionConfig;
use hbseed_core::error::HbaseError;
use hbseed_core::types::{ColumnFamily, Row, RowMutations, ScanSpec, ScannerId};
use tracing::{debug, warn};

use crate::connection::{Connection, Rpc};
use crate::convert::{self, map_thrift_error, no_attributes};

/// Blocking client for an HBase Thrift gateway.
///
/// The socket is released by [`close`](HbaseClient::close) or, at the
/// latest, when the client is dropped.
pub struct ThriftClient {
    connection: Option<Connection>,
}

impl ThriftClient {
    /// Opens a connection to the gateway described by `config`.
    ///
    /// # Errors
    ///
    /// `HbaseError::Connection` when the host cannot be resolved or reached.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, HbaseError> {
        let connection = Connection::open(config)?;
        Ok(Self {
            connection: Some(connection),
        })
    }

    /// `host:port` of the gateway, `None` once closed.
    pub fn addr(&self) -> Option<&str> {
        self.connection.as_ref().map(Connection::addr)
    }

    /// Runs one service call on the open connection.
    fn call<T>(
        &mut self,
        method: &'static str,
        call: impl FnOnce(&mut Rpc) -> thrift::Result<T>,
    ) -> Result<T, HbaseError> {
        let connection = self.connection.as_mut().ok_or(HbaseError::ConnectionClosed)?;
        debug!(method, "thrift call");
        call(&mut connection.rpc).map_err(map_thrift_error)
    }
}

impl HbaseClient for ThriftClient {
    fn table_names(&mut self) -> Result<Vec<String>, HbaseError> {
        let names = self.call("getTableNames", |rpc| rpc.get_table_names())?;
        Ok(names
            .iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect())
    }

    fn column_families(
        &mut self,
        table: &str,
    ) -> Result<BTreeMap<String, ColumnFamily>, HbaseError> {
        let descriptors = self.call("getColumnDescriptors", |rpc| {
            rpc.get_column_descriptors(table.as_bytes().to_vec())
        })?;
        Ok(descriptors
            .values()
            .map(|cd| (convert::family_name(cd), convert::column_family(cd)))
            .collect())
    }

    fn create_table(&mut self, table: &str, families: &[ColumnFamily]) -> Result<(), HbaseError> {
        let descriptors = families.iter().map(convert::column_descriptor).collect();
        match self.call("createTable", |rpc| {
            rpc.create_table(table.as_bytes().to_vec(), descriptors)
        }) {
            // the gateway puts its own text in the message, report the table instead
            Err(HbaseError::TableAlreadyExists(_)) => {
                Err(HbaseError::TableAlreadyExists(table.to_owned()))
            }
            other => other,
        }
    }

    fn mutate_rows(&mut self, table: &str, rows: &[RowMutations]) -> Result<(), HbaseError> {
        let batches = rows.iter().map(convert::batch_mutation).collect();
        self.call("mutateRows", |rpc| {
            rpc.mutate_rows(table.as_bytes().to_vec(), batches, no_attributes())
        })
    }

    fn open_scanner(&mut self, table: &str, scan: &ScanSpec) -> Result<ScannerId, HbaseError> {
        let scan = convert::scan(scan);
        let id = self.call("scannerOpenWithScan", |rpc| {
            rpc.scanner_open_with_scan(table.as_bytes().to_vec(), scan, no_attributes())
        })?;
        Ok(ScannerId(id))
    }

    fn scanner_next(&mut self, id: ScannerId, max_rows: i32) -> Result<Vec<Row>, HbaseError> {
        let results = self.call("scannerGetList", |rpc| rpc.scanner_get_list(id.0, max_rows))?;
        Ok(results.into_iter().map(convert::row).collect())
    }

    fn close_scanner(&mut self, id: ScannerId) -> Result<(), HbaseError> {
        self.call("scannerClose", |rpc| rpc.scanner_close(id.0))
    }

    fn get_row(&mut self, table: &str, row: &[u8]) -> Result<Option<Row>, HbaseError> {
        let results = self.call("getRow", |rpc| {
            rpc.get_row(table.as_bytes().to_vec(), row.to_vec(), no_attributes())
        })?;
        Ok(results.into_iter().next().map(convert::row))
    }

    fn close(&mut self) -> Result<(), HbaseError> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        debug!(addr = connection.addr(), "closing thrift connection");
        connection
            .shutdown()
            .map_err(|e| HbaseError::Transport(e.to_string()))
    }
}

impl Drop for ThriftClient {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close thrift connection");
        }
    }
}
