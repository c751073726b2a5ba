//! 정렬 맵 기반의 인프로세스 [`HbaseClient`]
//!
//! 단일 리전 HBase 테이블 저장소처럼 동작합니다.
//! 행은 키 순서로 정렬되고, 컬럼마다 최신 셀 하나만 유지하며,
//! 스캐너는 열린 시점의 스냅샷을 읽습니다.
//! 테스트 대역이자 통합 테스트의 가짜 Thrift 게이트웨이 저장소로 사용됩니다.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::debug;

use crate::client::HbaseClient;
use crate::error::HbaseError;
use crate::types::{Cell, Column, ColumnFamily, Mutation, Row, RowMutations, ScanSpec, ScannerId};

#[derive(Debug, Clone)]
struct MemoryTable {
    families: Vec<ColumnFamily>,
    rows: BTreeMap<Vec<u8>, BTreeMap<String, Cell>>,
}

impl MemoryTable {
    fn has_family(&self, family: &str) -> bool {
        self.families.iter().any(|f| f.name == family)
    }
}

/// 인메모리 HBase 대역
#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: BTreeMap<String, MemoryTable>,
    scanners: HashMap<i32, VecDeque<Row>>,
    next_scanner: i32,
    clock: i64,
    mutate_calls: usize,
    fail_writes: bool,
    closed: bool,
}

impl MemoryClient {
    /// 테이블이 없는 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 `mutate_rows` 호출이 서버 `IOError`로 실패하도록 설정합니다.
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// 지금까지 받은 `mutate_rows` 호출 수
    pub fn mutate_calls(&self) -> usize {
        self.mutate_calls
    }

    /// 열려 있고 아직 닫히지 않은 스캐너 수
    pub fn open_scanners(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), HbaseError> {
        if self.closed {
            Err(HbaseError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn table(&self, name: &str) -> Result<&MemoryTable, HbaseError> {
        self.tables
            .get(name)
            .ok_or_else(|| HbaseError::TableNotFound(name.to_owned()))
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }
}

impl HbaseClient for MemoryClient {
    fn table_names(&mut self) -> Result<Vec<String>, HbaseError> {
        self.ensure_open()?;
        Ok(self.tables.keys().cloned().collect())
    }

    fn column_families(
        &mut self,
        table: &str,
    ) -> Result<BTreeMap<String, ColumnFamily>, HbaseError> {
        self.ensure_open()?;
        let table = self.table(table)?;
        Ok(table
            .families
            .iter()
            .map(|family| {
                let mut described = family.clone();
                described.max_versions = Some(family.effective_max_versions());
                (family.name.clone(), described)
            })
            .collect())
    }

    fn create_table(&mut self, table: &str, families: &[ColumnFamily]) -> Result<(), HbaseError> {
        self.ensure_open()?;
        if self.tables.contains_key(table) {
            return Err(HbaseError::TableAlreadyExists(table.to_owned()));
        }
        if families.is_empty() {
            return Err(HbaseError::IllegalArgument(format!(
                "table '{table}' needs at least one column family"
            )));
        }
        for (i, family) in families.iter().enumerate() {
            if families[..i].iter().any(|f| f.name == family.name) {
                return Err(HbaseError::IllegalArgument(format!(
                    "duplicate column family '{}'",
                    family.name
                )));
            }
        }

        debug!(table, families = families.len(), "creating in-memory table");
        self.tables.insert(
            table.to_owned(),
            MemoryTable {
                families: families.to_vec(),
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn mutate_rows(&mut self, table: &str, rows: &[RowMutations]) -> Result<(), HbaseError> {
        self.ensure_open()?;
        self.mutate_calls += 1;
        if self.fail_writes {
            return Err(HbaseError::ServerIo("simulated write failure".to_owned()));
        }

        // 모르는 패밀리가 있으면 아무것도 건드리지 않고 호출 전체를 거부
        let target = self.table(table)?;
        for row in rows {
            for mutation in &row.mutations {
                let Column { family, .. } = mutation.column();
                if !target.has_family(family) {
                    return Err(HbaseError::ServerIo(format!(
                        "column family '{family}' does not exist in table '{table}'"
                    )));
                }
            }
        }

        for row in rows {
            let timestamp = self.tick();
            let Some(target) = self.tables.get_mut(table) else {
                return Err(HbaseError::TableNotFound(table.to_owned()));
            };
            let columns = target.rows.entry(row.row.clone()).or_default();
            for mutation in &row.mutations {
                match mutation {
                    Mutation::Put { column, value } => {
                        columns.insert(column.to_string(), Cell::new(value.clone(), timestamp));
                    }
                    Mutation::Delete { column } => {
                        columns.remove(&column.to_string());
                    }
                }
            }
            if columns.is_empty() {
                target.rows.remove(&row.row);
            }
        }
        Ok(())
    }

    fn open_scanner(&mut self, table: &str, scan: &ScanSpec) -> Result<ScannerId, HbaseError> {
        self.ensure_open()?;
        let snapshot: VecDeque<Row> = self
            .table(table)?
            .rows
            .iter()
            .filter(|(key, _)| scan.contains_key(key))
            .filter_map(|(key, columns)| {
                let selected: BTreeMap<String, Cell> = columns
                    .iter()
                    .filter(|(name, _)| scan.selects_column(name))
                    .map(|(name, cell)| (name.clone(), cell.clone()))
                    .collect();
                (!selected.is_empty()).then(|| Row {
                    key: key.clone(),
                    columns: selected,
                })
            })
            .collect();

        self.next_scanner += 1;
        let id = self.next_scanner;
        self.scanners.insert(id, snapshot);
        Ok(ScannerId(id))
    }

    fn scanner_next(&mut self, id: ScannerId, max_rows: i32) -> Result<Vec<Row>, HbaseError> {
        self.ensure_open()?;
        let pending = self
            .scanners
            .get_mut(&id.0)
            .ok_or(HbaseError::UnknownScanner(id.0))?;
        let take = usize::try_from(max_rows.max(1))
            .unwrap_or(1)
            .min(pending.len());
        Ok(pending.drain(..take).collect())
    }

    fn close_scanner(&mut self, id: ScannerId) -> Result<(), HbaseError> {
        self.ensure_open()?;
        self.scanners
            .remove(&id.0)
            .map(|_| ())
            .ok_or(HbaseError::UnknownScanner(id.0))
    }

    fn get_row(&mut self, table: &str, row: &[u8]) -> Result<Option<Row>, HbaseError> {
        self.ensure_open()?;
        Ok(self.table(table)?.rows.get(row).map(|columns| Row {
            key: row.to_vec(),
            columns: columns.clone(),
        }))
    }

    fn close(&mut self) -> Result<(), HbaseError> {
        self.closed = true;
        self.scanners.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn families() -> Vec<ColumnFamily> {
        vec![
            ColumnFamily::new("personal_data").with_max_versions(3),
            ColumnFamily::new("job_data"),
        ]
    }

    fn put(row: &str, column: &str, value: &str) -> RowMutations {
        RowMutations {
            row: row.as_bytes().to_vec(),
            mutations: vec![Mutation::put(
                Column::parse(column).expect("valid column"),
                value.as_bytes(),
            )],
            write_to_wal: true,
        }
    }

    fn client_with_table() -> MemoryClient {
        let mut client = MemoryClient::new();
        client
            .create_table("employees1", &families())
            .expect("create should succeed");
        client
    }

    #[test]
    fn create_table_twice_reports_already_exists() {
        let mut client = client_with_table();
        let err = client
            .create_table("employees1", &families())
            .expect_err("second create should fail");
        assert!(matches!(err, HbaseError::TableAlreadyExists(name) if name == "employees1"));
    }

    #[test]
    fn create_table_rejects_empty_and_duplicate_families() {
        let mut client = MemoryClient::new();
        assert!(matches!(
            client.create_table("t", &[]),
            Err(HbaseError::IllegalArgument(_))
        ));
        assert!(matches!(
            client.create_table("t", &[ColumnFamily::new("f"), ColumnFamily::new("f")]),
            Err(HbaseError::IllegalArgument(_))
        ));
        assert!(client.table_names().expect("list").is_empty());
    }

    #[test]
    fn column_families_fill_in_default_versions() {
        let mut client = client_with_table();
        let described = client.column_families("employees1").expect("describe");
        assert_eq!(described.len(), 2);
        assert_eq!(described["personal_data"].max_versions, Some(3));
        assert_eq!(described["job_data"].max_versions, Some(3));
    }

    #[test]
    fn mutate_rows_put_then_get() {
        let mut client = client_with_table();
        client
            .mutate_rows("employees1", &[put("row1", "personal_data:name", "John Doe")])
            .expect("mutate");

        let row = client
            .get_row("employees1", b"row1")
            .expect("get")
            .expect("row present");
        assert_eq!(row.text("personal_data:name").as_deref(), Some("John Doe"));
        assert!(client.get_row("employees1", b"row9").expect("get").is_none());
    }

    #[test]
    fn mutate_rows_unknown_family_changes_nothing() {
        let mut client = client_with_table();
        let err = client
            .mutate_rows(
                "employees1",
                &[
                    put("row1", "personal_data:name", "John Doe"),
                    put("row2", "missing:name", "x"),
                ],
            )
            .expect_err("unknown family should fail");
        assert!(matches!(err, HbaseError::ServerIo(_)));
        assert!(client.get_row("employees1", b"row1").expect("get").is_none());
    }

    #[test]
    fn mutate_rows_missing_table() {
        let mut client = MemoryClient::new();
        assert!(matches!(
            client.mutate_rows("nope", &[put("r", "f:q", "v")]),
            Err(HbaseError::TableNotFound(_))
        ));
    }

    #[test]
    fn delete_last_column_removes_row() {
        let mut client = client_with_table();
        client
            .mutate_rows("employees1", &[put("row1", "job_data:position", "Engineer")])
            .expect("put");
        client
            .mutate_rows(
                "employees1",
                &[RowMutations {
                    row: b"row1".to_vec(),
                    mutations: vec![Mutation::delete(Column::new("job_data", "position"))],
                    write_to_wal: true,
                }],
            )
            .expect("delete");
        assert!(client.get_row("employees1", b"row1").expect("get").is_none());
    }

    #[test]
    fn scanner_returns_rows_in_key_order_in_chunks() {
        let mut client = client_with_table();
        client
            .mutate_rows(
                "employees1",
                &[
                    put("row3", "job_data:position", "c"),
                    put("row1", "job_data:position", "a"),
                    put("row2", "job_data:position", "b"),
                ],
            )
            .expect("mutate");

        let id = client
            .open_scanner("employees1", &ScanSpec::default())
            .expect("open");
        let first = client.scanner_next(id, 2).expect("next");
        let second = client.scanner_next(id, 2).expect("next");
        let third = client.scanner_next(id, 2).expect("next");

        let keys: Vec<_> = first.iter().chain(&second).map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec![b"row1".to_vec(), b"row2".to_vec(), b"row3".to_vec()]);
        assert!(third.is_empty());

        client.close_scanner(id).expect("close");
        assert_eq!(client.open_scanners(), 0);
        assert!(matches!(
            client.scanner_next(id, 1),
            Err(HbaseError::UnknownScanner(_))
        ));
    }

    #[test]
    fn scanner_applies_column_filter() {
        let mut client = client_with_table();
        client
            .mutate_rows(
                "employees1",
                &[
                    put("row1", "job_data:position", "a"),
                    put("row2", "personal_data:name", "b"),
                ],
            )
            .expect("mutate");
        let spec = ScanSpec {
            columns: vec!["job_data".to_owned()],
            ..Default::default()
        };
        let id = client.open_scanner("employees1", &spec).expect("open");
        let rows = client.scanner_next(id, 10).expect("next");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, b"row1");
    }

    #[test]
    fn closed_client_rejects_calls() {
        let mut client = client_with_table();
        client.close().expect("close");
        client.close().expect("second close is a no-op");
        assert!(client.is_closed());
        assert!(matches!(
            client.table_names(),
            Err(HbaseError::ConnectionClosed)
        ));
    }

    #[test]
    fn failing_writes_count_calls() {
        let mut client = client_with_table().with_failing_writes();
        assert!(client
            .mutate_rows("employees1", &[put("row1", "job_data:position", "a")])
            .is_err());
        assert_eq!(client.mutate_calls(), 1);
    }
}
