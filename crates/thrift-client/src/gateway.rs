//! Serving side of the `Hbase` service.
//!
//! [`GatewayHandler`] answers the calls hbseed issues from any shared
//! [`HbaseClient`]; every other method is refused with `UnknownMethod`.
//! [`serve`] runs the generated processor over one accepted connection.
//! Together they stand up an in-process gateway backed by a `MemoryClient`,
//! which is how the Thrift client is tested end to end.

use std::collections::BTreeMap;
use std::net::TcpStream;
use std::sync::{Arc, Mutex, MutexGuard};

use hbase_thrift::hbase::{
    BatchMutation, Bytes, ColumnDescriptor, HbaseSyncHandler, HbaseSyncProcessor, Mutation,
    ScannerID, TAccessControlEntity, TAppend, TCell, TIncrement, TRegionInfo, TRowResult, TScan,
    TThriftServerType, Text,
};
use hbseed_core::client::HbaseClient;
use hbseed_core::config::{ThriftProtocol, ThriftTransport};
use hbseed_core::error::HbaseError;
use hbseed_core::types::{ColumnFamily, RowMutations, ScannerId};
use thrift::server::TProcessor;
use thrift::{ApplicationError, ApplicationErrorKind, TransportErrorKind};
use tracing::debug;

use crate::connection::protocols;
use crate::convert::{self, service_error};

type Attributes = BTreeMap<Text, Text>;

/// Answers `Hbase` calls from a client shared between connections.
pub struct GatewayHandler<C> {
    store: Arc<Mutex<C>>,
}

impl<C> GatewayHandler<C> {
    pub fn new(store: Arc<Mutex<C>>) -> Self {
        Self { store }
    }
}

impl<C: HbaseClient> GatewayHandler<C> {
    fn with_store<T>(
        &self,
        op: impl FnOnce(&mut C) -> Result<T, HbaseError>,
    ) -> thrift::Result<T> {
        let mut store: MutexGuard<'_, C> = self
            .store
            .lock()
            .map_err(|_| service_error(HbaseError::ServerIo("store lock poisoned".to_owned())))?;
        op(&mut *store).map_err(service_error)
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn unsupported<T>(method: &str) -> thrift::Result<T> {
    Err(ApplicationError::new(
        ApplicationErrorKind::UnknownMethod,
        format!("{method} is not served by this gateway"),
    )
    .into())
}

impl<C: HbaseClient> HbaseSyncHandler for GatewayHandler<C> {
    fn handle_get_table_names(&self) -> thrift::Result<Vec<Text>> {
        self.with_store(|store| {
            Ok(store
                .table_names()?
                .into_iter()
                .map(String::into_bytes)
                .collect())
        })
    }

    fn handle_get_column_descriptors(
        &self,
        table_name: Text,
    ) -> thrift::Result<BTreeMap<Text, ColumnDescriptor>> {
        self.with_store(|store| {
            Ok(store
                .column_families(&text(&table_name))?
                .values()
                .map(|family| {
                    let cd = convert::column_descriptor(family);
                    (cd.name.clone().unwrap_or_default(), cd)
                })
                .collect())
        })
    }

    fn handle_create_table(
        &self,
        table_name: Text,
        column_families: Vec<ColumnDescriptor>,
    ) -> thrift::Result<()> {
        let families: Vec<ColumnFamily> =
            column_families.iter().map(convert::column_family).collect();
        self.with_store(|store| store.create_table(&text(&table_name), &families))
    }

    fn handle_mutate_rows(
        &self,
        table_name: Text,
        row_batches: Vec<BatchMutation>,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        let rows = row_batches
            .into_iter()
            .map(convert::row_mutations)
            .collect::<Result<Vec<RowMutations>, _>>()
            .map_err(service_error)?;
        self.with_store(|store| store.mutate_rows(&text(&table_name), &rows))
    }

    fn handle_scanner_open_with_scan(
        &self,
        table_name: Text,
        scan: TScan,
        _attributes: Attributes,
    ) -> thrift::Result<ScannerID> {
        let spec = convert::scan_spec(scan);
        self.with_store(|store| Ok(store.open_scanner(&text(&table_name), &spec)?.0))
    }

    fn handle_scanner_get_list(
        &self,
        id: ScannerID,
        nb_rows: i32,
    ) -> thrift::Result<Vec<TRowResult>> {
        self.with_store(|store| {
            Ok(store
                .scanner_next(ScannerId(id), nb_rows)?
                .iter()
                .map(convert::row_result)
                .collect())
        })
    }

    fn handle_scanner_get(&self, id: ScannerID) -> thrift::Result<Vec<TRowResult>> {
        self.handle_scanner_get_list(id, 1)
    }

    fn handle_scanner_close(&self, id: ScannerID) -> thrift::Result<()> {
        self.with_store(|store| store.close_scanner(ScannerId(id)))
    }

    fn handle_get_row(
        &self,
        table_name: Text,
        row: Text,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        self.with_store(|store| {
            Ok(store
                .get_row(&text(&table_name), &row)?
                .iter()
                .map(convert::row_result)
                .collect())
        })
    }

    // Everything below is outside what hbseed calls.

    fn handle_enable_table(&self, _table_name: Bytes) -> thrift::Result<()> {
        unsupported("enableTable")
    }

    fn handle_disable_table(&self, _table_name: Bytes) -> thrift::Result<()> {
        unsupported("disableTable")
    }

    fn handle_is_table_enabled(&self, _table_name: Bytes) -> thrift::Result<bool> {
        unsupported("isTableEnabled")
    }

    fn handle_compact(&self, _table_name_or_region_name: Bytes) -> thrift::Result<()> {
        unsupported("compact")
    }

    fn handle_major_compact(&self, _table_name_or_region_name: Bytes) -> thrift::Result<()> {
        unsupported("majorCompact")
    }

    fn handle_get_table_names_with_is_table_enabled(
        &self,
    ) -> thrift::Result<BTreeMap<Text, bool>> {
        unsupported("getTableNamesWithIsTableEnabled")
    }

    fn handle_get_table_regions(&self, _table_name: Text) -> thrift::Result<Vec<TRegionInfo>> {
        unsupported("getTableRegions")
    }

    fn handle_delete_table(&self, _table_name: Text) -> thrift::Result<()> {
        unsupported("deleteTable")
    }

    fn handle_get(
        &self,
        _table_name: Text,
        _row: Text,
        _column: Text,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TCell>> {
        unsupported("get")
    }

    fn handle_get_ver(
        &self,
        _table_name: Text,
        _row: Text,
        _column: Text,
        _num_versions: i32,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TCell>> {
        unsupported("getVer")
    }

    fn handle_get_ver_ts(
        &self,
        _table_name: Text,
        _row: Text,
        _column: Text,
        _timestamp: i64,
        _num_versions: i32,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TCell>> {
        unsupported("getVerTs")
    }

    fn handle_get_row_with_columns(
        &self,
        _table_name: Text,
        _row: Text,
        _columns: Vec<Text>,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        unsupported("getRowWithColumns")
    }

    fn handle_get_row_ts(
        &self,
        _table_name: Text,
        _row: Text,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        unsupported("getRowTs")
    }

    fn handle_get_row_with_columns_ts(
        &self,
        _table_name: Text,
        _row: Text,
        _columns: Vec<Text>,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        unsupported("getRowWithColumnsTs")
    }

    fn handle_get_rows(
        &self,
        _table_name: Text,
        _rows: Vec<Text>,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        unsupported("getRows")
    }

    fn handle_get_rows_with_columns(
        &self,
        _table_name: Text,
        _rows: Vec<Text>,
        _columns: Vec<Text>,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        unsupported("getRowsWithColumns")
    }

    fn handle_get_rows_ts(
        &self,
        _table_name: Text,
        _rows: Vec<Text>,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        unsupported("getRowsTs")
    }

    fn handle_get_rows_with_columns_ts(
        &self,
        _table_name: Text,
        _rows: Vec<Text>,
        _columns: Vec<Text>,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<Vec<TRowResult>> {
        unsupported("getRowsWithColumnsTs")
    }

    fn handle_mutate_row(
        &self,
        _table_name: Text,
        _row: Text,
        _mutations: Vec<Mutation>,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        unsupported("mutateRow")
    }

    fn handle_mutate_row_ts(
        &self,
        _table_name: Text,
        _row: Text,
        _mutations: Vec<Mutation>,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        unsupported("mutateRowTs")
    }

    fn handle_mutate_rows_ts(
        &self,
        _table_name: Text,
        _row_batches: Vec<BatchMutation>,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        unsupported("mutateRowsTs")
    }

    fn handle_atomic_increment(
        &self,
        _table_name: Text,
        _row: Text,
        _column: Text,
        _value: i64,
    ) -> thrift::Result<i64> {
        unsupported("atomicIncrement")
    }

    fn handle_delete_all(
        &self,
        _table_name: Text,
        _row: Text,
        _column: Text,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        unsupported("deleteAll")
    }

    fn handle_delete_all_ts(
        &self,
        _table_name: Text,
        _row: Text,
        _column: Text,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        unsupported("deleteAllTs")
    }

    fn handle_delete_all_row(
        &self,
        _table_name: Text,
        _row: Text,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        unsupported("deleteAllRow")
    }

    fn handle_increment(&self, _increment: TIncrement) -> thrift::Result<()> {
        unsupported("increment")
    }

    fn handle_increment_rows(&self, _increments: Vec<TIncrement>) -> thrift::Result<()> {
        unsupported("incrementRows")
    }

    fn handle_delete_all_row_ts(
        &self,
        _table_name: Text,
        _row: Text,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<()> {
        unsupported("deleteAllRowTs")
    }

    fn handle_scanner_open(
        &self,
        _table_name: Text,
        _start_row: Text,
        _columns: Vec<Text>,
        _attributes: Attributes,
    ) -> thrift::Result<ScannerID> {
        unsupported("scannerOpen")
    }

    fn handle_scanner_open_with_stop(
        &self,
        _table_name: Text,
        _start_row: Text,
        _stop_row: Text,
        _columns: Vec<Text>,
        _attributes: Attributes,
    ) -> thrift::Result<ScannerID> {
        unsupported("scannerOpenWithStop")
    }

    fn handle_scanner_open_with_prefix(
        &self,
        _table_name: Text,
        _start_and_prefix: Text,
        _columns: Vec<Text>,
        _attributes: Attributes,
    ) -> thrift::Result<ScannerID> {
        unsupported("scannerOpenWithPrefix")
    }

    fn handle_scanner_open_ts(
        &self,
        _table_name: Text,
        _start_row: Text,
        _columns: Vec<Text>,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<ScannerID> {
        unsupported("scannerOpenTs")
    }

    fn handle_scanner_open_with_stop_ts(
        &self,
        _table_name: Text,
        _start_row: Text,
        _stop_row: Text,
        _columns: Vec<Text>,
        _timestamp: i64,
        _attributes: Attributes,
    ) -> thrift::Result<ScannerID> {
        unsupported("scannerOpenWithStopTs")
    }

    fn handle_get_region_info(&self, _row: Text) -> thrift::Result<TRegionInfo> {
        unsupported("getRegionInfo")
    }

    fn handle_append(&self, _append: TAppend) -> thrift::Result<Vec<TCell>> {
        unsupported("append")
    }

    fn handle_check_and_put(
        &self,
        _table_name: Text,
        _row: Text,
        _column: Text,
        _value: Text,
        _mput: Mutation,
        _attributes: Attributes,
    ) -> thrift::Result<bool> {
        unsupported("checkAndPut")
    }

    fn handle_get_thrift_server_type(&self) -> thrift::Result<TThriftServerType> {
        unsupported("getThriftServerType")
    }

    fn handle_get_cluster_id(&self) -> thrift::Result<String> {
        unsupported("getClusterId")
    }

    fn handle_grant(&self, _info: TAccessControlEntity) -> thrift::Result<bool> {
        unsupported("grant")
    }

    fn handle_revoke(&self, _info: TAccessControlEntity) -> thrift::Result<bool> {
        unsupported("revoke")
    }
}

/// Serves calls on `stream` with `handler` until the peer disconnects.
pub fn serve<H: HbaseSyncHandler>(
    stream: TcpStream,
    transport: ThriftTransport,
    protocol: ThriftProtocol,
    handler: H,
) -> thrift::Result<()> {
    let processor = HbaseSyncProcessor::new(handler);
    let (mut input, mut output) = protocols(stream, transport, protocol)?;
    loop {
        match processor.process(&mut *input, &mut *output) {
            Ok(()) => {}
            Err(thrift::Error::Transport(e)) if e.kind == TransportErrorKind::EndOfFile => {
                debug!("peer disconnected");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}
