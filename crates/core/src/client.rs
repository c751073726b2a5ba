//! HBase 접근 추상화
//!
//! [`HbaseClient`]는 hbseed가 사용하는 Thrift1 `Hbase` 서비스의 일부를 그대로 옮긴 trait입니다.
//! 프로덕션에서는 `hbseed-thrift` 크레이트의 Thrift 구현을,
//! 테스트에서는 [`MemoryClient`](crate::memory::MemoryClient)를 사용합니다.
//!
//! ```text
//!   seed / Table / Batch / Scanner
//!                 │
//!                 ▼
//!          ┌─────────────┐
//!          │ HbaseClient │ (trait)
//!          └─────────────┘
//!             │        │
//!             ▼        ▼
//!      ThriftClient  MemoryClient
//!             │
//!             ▼
//!    HBase Thrift gateway
//! ```
//!
//! 모든 호출은 블로킹이며 `&mut self`를 받습니다.
//! Thrift 연결은 하나의 소켓이고 한 번에 하나의 요청만 처리합니다.

use std::collections::BTreeMap;

use crate::error::HbaseError;
use crate::types::{ColumnFamily, Row, RowMutations, ScanSpec, ScannerId};

/// HBase 클러스터에 대한 연산
///
/// # Errors
///
/// - `HbaseError::TableAlreadyExists`: 이미 있는 테이블에 `create_table` 호출
/// - `HbaseError::ServerIo`: 서버 측 실패 (테이블 없음, 리전 에러 등)
/// - `HbaseError::Transport` / `HbaseError::Protocol`: 연결이 끊어짐
/// - `HbaseError::ConnectionClosed`: [`close`](Self::close) 이후 사용
pub trait HbaseClient {
    /// 모든 테이블 이름을 반환합니다.
    fn table_names(&mut self) -> Result<Vec<String>, HbaseError>;

    /// `table`의 컬럼 패밀리를 패밀리 이름(`:` 제외) 기준으로 반환합니다.
    fn column_families(
        &mut self,
        table: &str,
    ) -> Result<BTreeMap<String, ColumnFamily>, HbaseError>;

    /// 주어진 패밀리로 `table`을 생성합니다.
    fn create_table(&mut self, table: &str, families: &[ColumnFamily]) -> Result<(), HbaseError>;

    /// 여러 행에 뮤테이션을 적용합니다.
    /// 행 단위로는 원자적이지만 호출 전체는 원자적이지 않습니다.
    fn mutate_rows(&mut self, table: &str, rows: &[RowMutations]) -> Result<(), HbaseError>;

    /// 서버 측 스캐너를 엽니다.
    fn open_scanner(&mut self, table: &str, scan: &ScanSpec) -> Result<ScannerId, HbaseError>;

    /// 최대 `max_rows`개 행을 가져옵니다. 빈 결과는 스캐너가 끝났다는 뜻입니다.
    fn scanner_next(&mut self, id: ScannerId, max_rows: i32) -> Result<Vec<Row>, HbaseError>;

    /// 서버 측 스캐너를 해제합니다.
    fn close_scanner(&mut self, id: ScannerId) -> Result<(), HbaseError>;

    /// `row`의 모든 컬럼 최신 버전. 행이 비어 있으면 `None`.
    fn get_row(&mut self, table: &str, row: &[u8]) -> Result<Option<Row>, HbaseError>;

    /// 연결을 해제합니다. 두 번 호출해도 아무 일도 일어나지 않습니다.
    fn close(&mut self) -> Result<(), HbaseError>;
}
