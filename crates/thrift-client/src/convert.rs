//! Mapping between hbseed's domain types and the generated `Hbase` structs.
//!
//! Every generated field is optional and its `Default` fills zeros, so the
//! outgoing structs are spelled out field by field instead.

use std::collections::BTreeMap;

use hbase_thrift::hbase::{
    AlreadyExists, BatchMutation, ColumnDescriptor, IOError, IllegalArgument, Mutation, TCell,
    TRowResult, TScan,
};
use hbseed_core::error::HbaseError;
use hbseed_core::types::{self as domain, Cell, Column, ColumnFamily, Row, RowMutations, ScanSpec};

/// Gateway fallbacks for `ColumnDescriptor` fields, from `Hbase.thrift`.
const DEFAULT_COMPRESSION: &str = "NONE";
const DEFAULT_BLOOM_FILTER: &str = "NONE";
const DEFAULT_TIME_TO_LIVE: i32 = i32::MAX;

/// Request attributes. hbseed never sets any.
pub(crate) fn no_attributes() -> BTreeMap<Vec<u8>, Vec<u8>> {
    BTreeMap::new()
}

pub fn column_descriptor(family: &ColumnFamily) -> ColumnDescriptor {
    ColumnDescriptor {
        name: Some(format!("{}:", family.name).into_bytes()),
        max_versions: Some(family.effective_max_versions()),
        compression: Some(
            family
                .compression
                .clone()
                .unwrap_or_else(|| DEFAULT_COMPRESSION.to_owned()),
        ),
        in_memory: Some(family.in_memory),
        bloom_filter_type: Some(
            family
                .bloom_filter_type
                .clone()
                .unwrap_or_else(|| DEFAULT_BLOOM_FILTER.to_owned()),
        ),
        bloom_filter_vector_size: Some(0),
        bloom_filter_nb_hashes: Some(0),
        block_cache_enabled: Some(family.block_cache_enabled),
        time_to_live: Some(family.time_to_live.unwrap_or(DEFAULT_TIME_TO_LIVE)),
    }
}

/// Family name without the trailing `:`.
pub fn family_name(descriptor: &ColumnDescriptor) -> String {
    let name = String::from_utf8_lossy(descriptor.name.as_deref().unwrap_or_default());
    name.strip_suffix(':').unwrap_or(&name).to_owned()
}

pub fn column_family(descriptor: &ColumnDescriptor) -> ColumnFamily {
    ColumnFamily {
        name: family_name(descriptor),
        max_versions: descriptor.max_versions,
        compression: descriptor.compression.clone(),
        in_memory: descriptor.in_memory.unwrap_or(false),
        bloom_filter_type: descriptor.bloom_filter_type.clone(),
        block_cache_enabled: descriptor.block_cache_enabled.unwrap_or(false),
        time_to_live: descriptor.time_to_live,
    }
}

pub fn batch_mutation(row: &RowMutations) -> BatchMutation {
    let mutations = row
        .mutations
        .iter()
        .map(|mutation| {
            let (is_delete, value) = match mutation {
                domain::Mutation::Put { value, .. } => (false, value.clone()),
                domain::Mutation::Delete { .. } => (true, Vec::new()),
            };
            Mutation {
                is_delete: Some(is_delete),
                column: Some(mutation.column().to_string().into_bytes()),
                value: Some(value),
                write_to_w_a_l: Some(row.write_to_wal),
            }
        })
        .collect();

    BatchMutation {
        row: Some(row.row.clone()),
        mutations: Some(mutations),
    }
}

/// Decodes one batch as received by the gateway.
///
/// # Errors
///
/// `HbaseError::InvalidColumn` when a column is not `family:qualifier`.
pub fn row_mutations(batch: BatchMutation) -> Result<RowMutations, HbaseError> {
    let incoming = batch.mutations.unwrap_or_default();
    let write_to_wal = incoming.iter().all(|m| m.write_to_w_a_l.unwrap_or(true));

    let mutations = incoming
        .into_iter()
        .map(|m| {
            let column = Column::parse(&String::from_utf8_lossy(&m.column.unwrap_or_default()))?;
            Ok(if m.is_delete.unwrap_or(false) {
                domain::Mutation::delete(column)
            } else {
                domain::Mutation::put(column, m.value.unwrap_or_default())
            })
        })
        .collect::<Result<Vec<_>, HbaseError>>()?;

    Ok(RowMutations {
        row: batch.row.unwrap_or_default(),
        mutations,
        write_to_wal,
    })
}

pub fn row_result(row: &Row) -> TRowResult {
    let columns = row
        .columns
        .iter()
        .map(|(name, cell)| {
            (
                name.clone().into_bytes(),
                TCell {
                    value: Some(cell.value.clone()),
                    timestamp: Some(cell.timestamp),
                },
            )
        })
        .collect();

    TRowResult {
        row: Some(row.key.clone()),
        columns: Some(columns),
        sorted_columns: None,
    }
}

/// Reads a result from either the `columns` map or, when the scan asked for
/// sorted columns, the `sortedColumns` list.
pub fn row(result: TRowResult) -> Row {
    let cells: Vec<(Vec<u8>, TCell)> = match (result.columns, result.sorted_columns) {
        (Some(columns), _) if !columns.is_empty() => columns.into_iter().collect(),
        (_, Some(sorted)) => sorted
            .into_iter()
            .filter_map(|column| Some((column.column_name?, column.cell?)))
            .collect(),
        _ => Vec::new(),
    };

    Row {
        key: result.row.unwrap_or_default(),
        columns: cells
            .into_iter()
            .map(|(name, cell)| {
                (
                    String::from_utf8_lossy(&name).into_owned(),
                    Cell::new(cell.value.unwrap_or_default(), cell.timestamp.unwrap_or(0)),
                )
            })
            .collect(),
    }
}

pub fn scan(spec: &ScanSpec) -> TScan {
    let columns: Vec<Vec<u8>> = spec
        .columns
        .iter()
        .map(|column| column.as_bytes().to_vec())
        .collect();

    TScan {
        start_row: spec.start_row.clone(),
        stop_row: spec.stop_row.clone(),
        timestamp: None,
        columns: (!columns.is_empty()).then_some(columns),
        caching: Some(spec.caching),
        filter_string: None,
        batch_size: None,
        sort_columns: None,
        reversed: None,
        cache_blocks: None,
    }
}

/// The limit is applied client side and never travels.
pub fn scan_spec(scan: TScan) -> ScanSpec {
    let defaults = ScanSpec::default();
    ScanSpec {
        start_row: scan.start_row.filter(|row| !row.is_empty()),
        stop_row: scan.stop_row.filter(|row| !row.is_empty()),
        columns: scan
            .columns
            .unwrap_or_default()
            .iter()
            .map(|column| String::from_utf8_lossy(column).into_owned())
            .collect(),
        caching: scan
            .caching
            .filter(|caching| *caching > 0)
            .unwrap_or(defaults.caching),
        limit: None,
    }
}

pub fn map_thrift_error(err: thrift::Error) -> HbaseError {
    match err {
        thrift::Error::Transport(e) => HbaseError::Transport(e.to_string()),
        thrift::Error::Protocol(e) => HbaseError::Protocol(e.to_string()),
        thrift::Error::Application(e) => HbaseError::Application(e.to_string()),
        thrift::Error::User(e) => {
            if let Some(io) = e.downcast_ref::<IOError>() {
                HbaseError::ServerIo(io.message.clone().unwrap_or_default())
            } else if let Some(ia) = e.downcast_ref::<IllegalArgument>() {
                HbaseError::IllegalArgument(ia.message.clone().unwrap_or_default())
            } else if let Some(exists) = e.downcast_ref::<AlreadyExists>() {
                HbaseError::TableAlreadyExists(exists.message.clone().unwrap_or_default())
            } else {
                HbaseError::Protocol(e.to_string())
            }
        }
    }
}

/// The exception the gateway answers with for a failed call.
pub fn service_error(err: HbaseError) -> thrift::Error {
    match err {
        HbaseError::TableAlreadyExists(table) => AlreadyExists {
            message: Some(table),
        }
        .into(),
        HbaseError::IllegalArgument(message) => IllegalArgument {
            message: Some(message),
        }
        .into(),
        err @ HbaseError::InvalidColumn(_) => IllegalArgument {
            message: Some(err.to_string()),
        }
        .into(),
        HbaseError::ServerIo(message) => IOError {
            message: Some(message),
            can_retry: Some(false),
        }
        .into(),
        other => IOError {
            message: Some(other.to_string()),
            can_retry: Some(false),
        }
        .into(),
    }
}
