//! 테이블 핸들: 배치 쓰기와 지연 스캔
//!
//! [`Table`]은 살아 있는 동안 [`HbaseClient`]를 가변 대여하므로
//! 한 연결에서 동시에 활성화되는 배치나 스캐너는 최대 하나입니다.
//!
//! # Examples
//!
//! ```
//! use hbseed_core::client::HbaseClient;
//! use hbseed_core::memory::MemoryClient;
//! use hbseed_core::table::{BatchOptions, Table};
//! use hbseed_core::types::{ColumnFamily, ScanSpec};
//!
//! let mut client = MemoryClient::new();
//! client.create_table("employees1", &[ColumnFamily::new("job_data")])?;
//!
//! let mut table = Table::new(&mut client, "employees1");
//! table.with_batch(BatchOptions::default(), |batch| {
//!     batch.put("row1", [("job_data:position", "Engineer")])
//! })?;
//!
//! for row in table.scan(ScanSpec::default())? {
//!     println!("{}", row?);
//! }
//! # Ok::<(), hbseed_core::error::HbaseError>(())
//! ```

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use tracing::{debug, warn};

use crate::client::HbaseClient;
use crate::error::HbaseError;
use crate::types::{
    Column, ColumnFamily, DEFAULT_SCAN_CACHING, Mutation, Row, RowMutations, ScanSpec, ScannerId,
};

/// 연결 위의 이름 있는 테이블
pub struct Table<'c, C: HbaseClient + ?Sized> {
    client: &'c mut C,
    name: String,
}

impl<'c, C: HbaseClient + ?Sized> Table<'c, C> {
    /// `name` 테이블에 대한 연산용으로 `client`를 감쌉니다. 테이블 존재 여부는 확인하지 않습니다.
    pub fn new(client: &'c mut C, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 서버 테이블 목록에 있는지 확인합니다.
    pub fn exists(&mut self) -> Result<bool, HbaseError> {
        Ok(self
            .client
            .table_names()?
            .iter()
            .any(|name| *name == self.name))
    }

    /// 이름 기준 컬럼 패밀리
    pub fn families(&mut self) -> Result<BTreeMap<String, ColumnFamily>, HbaseError> {
        self.client.column_families(&self.name)
    }

    /// 단일 행의 최신 값
    pub fn row(&mut self, key: impl AsRef<[u8]>) -> Result<Option<Row>, HbaseError> {
        self.client.get_row(&self.name, key.as_ref())
    }

    /// `spec`이 선택하는 행에 대한 지연 스캔을 엽니다.
    pub fn scan(&mut self, spec: ScanSpec) -> Result<Scanner<'_, C>, HbaseError> {
        let id = self.client.open_scanner(&self.name, &spec)?;
        debug!(table = %self.name, scanner = %id, "scanner opened");
        let caching = if spec.caching > 0 {
            spec.caching
        } else {
            DEFAULT_SCAN_CACHING
        };
        Ok(Scanner {
            client: &mut *self.client,
            id: Some(id),
            buffer: VecDeque::new(),
            caching,
            limit: spec.limit,
            returned: 0,
            failed: false,
        })
    }

    /// 배치를 시작합니다. 뮤테이션은 [`Batch::send`] 호출 시 전송되며,
    /// `batch_size`가 설정되어 있으면 그만큼 쌓일 때마다 전송됩니다.
    pub fn batch(&mut self, options: BatchOptions) -> Batch<'_, C> {
        Batch {
            client: &mut *self.client,
            table: &self.name,
            options,
            pending: Vec::new(),
            pending_mutations: 0,
            stats: BatchStats::default(),
        }
    }

    /// 새 배치로 `body`를 실행하고, 반환되면 쌓인 뮤테이션을 전송합니다.
    ///
    /// body가 실패해도 쌓인 뮤테이션은 전송됩니다.
    /// 단, `options.transaction`이 설정되어 있으면 폐기합니다.
    /// 어느 경우든 body의 에러를 반환합니다.
    pub fn with_batch<F>(&mut self, options: BatchOptions, body: F) -> Result<BatchStats, HbaseError>
    where
        F: FnOnce(&mut Batch<'_, C>) -> Result<(), HbaseError>,
    {
        let mut batch = self.batch(options);
        match body(&mut batch) {
            Ok(()) => {
                if let Err(err) = batch.send() {
                    // 이미 보고된 실패, drop 시 재전송하지 않음
                    batch.discard();
                    return Err(err);
                }
                Ok(batch.stats())
            }
            Err(err) => {
                if options.transaction {
                    debug!(
                        table = batch.table,
                        discarded = batch.pending_mutations,
                        "batch body failed, discarding staged mutations"
                    );
                    batch.discard();
                } else if let Err(send_err) = batch.send() {
                    warn!(
                        table = batch.table,
                        error = %send_err,
                        "failed to send staged mutations after batch body failed"
                    );
                    batch.discard();
                }
                Err(err)
            }
        }
    }
}

/// 배치가 뮤테이션을 묶고 전송하는 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// 이 개수만큼 쌓이면 자동 전송
    pub batch_size: Option<usize>,
    /// 배치 body 실패 시 쌓인 뮤테이션 폐기
    pub transaction: bool,
    /// WAL(write-ahead log) 기록 여부
    pub write_to_wal: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: None,
            transaction: false,
            write_to_wal: true,
        }
    }
}

/// 배치가 실제로 전송한 양
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// `mutate_rows` 호출 수
    pub requests: usize,
    /// 전송한 행 엔트리 수 (두 번의 flush에 걸친 행은 두 번 셈)
    pub rows: usize,
    /// 전송한 개별 컬럼 뮤테이션 수
    pub mutations: usize,
}

/// 클라이언트 측 뮤테이션 묶음. 쌓인 순서대로 행마다 엔트리 하나.
pub struct Batch<'a, C: HbaseClient + ?Sized> {
    client: &'a mut C,
    table: &'a str,
    options: BatchOptions,
    pending: Vec<RowMutations>,
    pending_mutations: usize,
    stats: BatchStats,
}

impl<C: HbaseClient + ?Sized> Batch<'_, C> {
    /// `row`에 모든 `(column, value)` 쌍의 put을 쌓습니다.
    ///
    /// 컬럼 이름은 `family:qualifier` 형식이어야 하며,
    /// 하나라도 아니면 아무것도 쌓지 않습니다.
    pub fn put<K, I, N, V>(&mut self, row: K, columns: I) -> Result<(), HbaseError>
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<[u8]>,
    {
        let mutations = columns
            .into_iter()
            .map(|(name, value)| {
                Ok(Mutation::put(
                    Column::parse(name.as_ref())?,
                    value.as_ref().to_vec(),
                ))
            })
            .collect::<Result<Vec<_>, HbaseError>>()?;
        self.stage(row.as_ref(), mutations)
    }

    /// `row`의 `columns` 삭제를 쌓습니다.
    pub fn delete<K, I, N>(&mut self, row: K, columns: I) -> Result<(), HbaseError>
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mutations = columns
            .into_iter()
            .map(|name| Ok(Mutation::delete(Column::parse(name.as_ref())?)))
            .collect::<Result<Vec<_>, HbaseError>>()?;
        self.stage(row.as_ref(), mutations)
    }

    /// 지금까지 쌓인 것을 모두 전송합니다. 쌓인 것이 없으면 아무 일도 하지 않습니다.
    ///
    /// 실패하면 쌓인 뮤테이션을 유지하므로 이후 `send`가 다시 시도합니다.
    pub fn send(&mut self) -> Result<(), HbaseError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        debug!(
            table = self.table,
            rows = self.pending.len(),
            mutations = self.pending_mutations,
            "sending batch"
        );
        self.client.mutate_rows(self.table, &self.pending)?;

        self.stats.requests += 1;
        self.stats.rows += self.pending.len();
        self.stats.mutations += self.pending_mutations;
        self.pending.clear();
        self.pending_mutations = 0;
        Ok(())
    }

    /// 쌓였지만 아직 전송되지 않은 뮤테이션 수
    pub fn pending_mutations(&self) -> usize {
        self.pending_mutations
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    fn discard(&mut self) {
        self.pending.clear();
        self.pending_mutations = 0;
    }

    fn stage(&mut self, row: &[u8], mutations: Vec<Mutation>) -> Result<(), HbaseError> {
        if mutations.is_empty() {
            return Ok(());
        }
        self.pending_mutations += mutations.len();
        match self.pending.iter_mut().find(|entry| entry.row == row) {
            Some(entry) => entry.mutations.extend(mutations),
            None => self.pending.push(RowMutations {
                row: row.to_vec(),
                mutations,
                write_to_wal: self.options.write_to_wal,
            }),
        }

        if let Some(limit) = self.options.batch_size {
            if self.pending_mutations >= limit {
                self.send()?;
            }
        }
        Ok(())
    }
}

/// 트랜잭션 배치가 아니면 남은 뮤테이션을 전송합니다.
impl<C: HbaseClient + ?Sized> Drop for Batch<'_, C> {
    fn drop(&mut self) {
        if self.pending_mutations == 0 {
            return;
        }
        if self.options.transaction {
            warn!(
                table = self.table,
                discarded = self.pending_mutations,
                "transactional batch dropped with unsent mutations"
            );
            return;
        }
        if let Err(err) = self.send() {
            warn!(
                table = self.table,
                unsent = self.pending_mutations,
                error = %err,
                "failed to flush batch on drop"
            );
        }
    }
}

/// 스캔 결과에 대한 지연 이터레이터
///
/// 행은 `caching`개씩 가져옵니다.
/// 서버 측 스캐너는 스캔이 끝나거나 `limit`개를 반환했을 때, 또는 이터레이터가 drop될 때 닫힙니다.
pub struct Scanner<'a, C: HbaseClient + ?Sized> {
    client: &'a mut C,
    id: Option<ScannerId>,
    buffer: VecDeque<Row>,
    caching: i32,
    limit: Option<usize>,
    returned: usize,
    failed: bool,
}

impl<C: HbaseClient + ?Sized> Scanner<'_, C> {
    fn finish(&mut self) -> Option<Result<Row, HbaseError>> {
        let id = self.id.take()?;
        debug!(scanner = %id, returned = self.returned, "closing scanner");
        self.client.close_scanner(id).err().map(Err)
    }

    fn next_fetch_size(&self) -> i32 {
        match self.limit {
            Some(limit) => {
                let remaining = i32::try_from(limit - self.returned).unwrap_or(i32::MAX);
                remaining.min(self.caching)
            }
            None => self.caching,
        }
    }
}

impl<C: HbaseClient + ?Sized> Iterator for Scanner<'_, C> {
    type Item = Result<Row, HbaseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.limit.is_some_and(|limit| self.returned >= limit) {
            return self.finish();
        }

        if self.buffer.is_empty() {
            let id = self.id?;
            match self.client.scanner_next(id, self.next_fetch_size()) {
                Ok(rows) if rows.is_empty() => return self.finish(),
                Ok(rows) => self.buffer.extend(rows),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }

        let row = self.buffer.pop_front()?;
        self.returned += 1;
        Some(Ok(row))
    }
}

impl<C: HbaseClient + ?Sized> Drop for Scanner<'_, C> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            if let Err(err) = self.client.close_scanner(id) {
                warn!(scanner = %id, error = %err, "failed to close scanner");
            }
        }
    }
}
