//! 시드 흐름: 테이블 보장, 한 번의 배치로 행 쓰기, 다시 스캔

use tracing::info;

use crate::client::HbaseClient;
use crate::config::{HbseedConfig, SeedRow};
use crate::error::HbaseError;
use crate::table::{BatchOptions, BatchStats, Table};
use crate::types::{ColumnFamily, Row, ScanSpec};

/// 시드 실행 한 번에 필요한 모든 것
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub table: String,
    pub families: Vec<ColumnFamily>,
    pub rows: Vec<SeedRow>,
    pub batch: BatchOptions,
    pub scan: ScanSpec,
}

impl SeedPlan {
    pub fn from_config(config: &HbseedConfig) -> Self {
        Self {
            table: config.table.name.clone(),
            families: config.table.families.clone(),
            rows: config.rows.clone(),
            batch: config.batch.options(),
            scan: config.scan.spec(),
        }
    }
}

/// 시드 실행 결과
#[derive(Debug, Clone)]
pub struct SeedOutcome {
    pub table: String,
    /// 테이블이 이미 있었으면 false
    pub created: bool,
    pub written: BatchStats,
    pub rows: Vec<Row>,
}

/// `table`이 없으면 생성합니다.
///
/// 생성했으면 `Ok(true)`, 서버가 이미 존재한다고 보고하면 `Ok(false)`를 반환합니다.
/// 그 외의 실패는 모두 전파합니다.
pub fn ensure_table<C: HbaseClient + ?Sized>(
    client: &mut C,
    table: &str,
    families: &[ColumnFamily],
) -> Result<bool, HbaseError> {
    match client.create_table(table, families) {
        Ok(()) => {
            info!(table, families = families.len(), "table created");
            Ok(true)
        }
        Err(HbaseError::TableAlreadyExists(_)) => {
            info!(table, "table already exists");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// 시드 진행 이벤트. 각 단계가 끝날 때마다 보고됩니다.
#[derive(Debug, Clone, Copy)]
pub enum SeedEvent<'a> {
    /// 테이블 사용 가능. 이미 있었으면 `created`는 false
    TableReady { table: &'a str, created: bool },
    /// 배치가 서버에 도달함
    Written(BatchStats),
    /// 스캔에서 한 행이 돌아옴
    Row(&'a Row),
}

/// `client`로 전체 흐름을 실행합니다.
///
/// 클라이언트는 열린 채로 둡니다. 닫는 것은 호출자의 책임입니다.
pub fn run<C: HbaseClient + ?Sized>(
    client: &mut C,
    plan: &SeedPlan,
) -> Result<SeedOutcome, HbaseError> {
    run_with(client, plan, |_| Ok::<(), HbaseError>(()))
}

/// [`run`]과 같지만 각 단계가 끝날 때마다 `on_event`를 호출합니다.
///
/// `on_event`가 에러를 반환하면 실행을 중단합니다.
/// 이후 단계가 실패해도 이미 보고된 단계는 그대로 남습니다.
pub fn run_with<C, E, F>(client: &mut C, plan: &SeedPlan, mut on_event: F) -> Result<SeedOutcome, E>
where
    C: HbaseClient + ?Sized,
    E: From<HbaseError>,
    F: FnMut(SeedEvent<'_>) -> Result<(), E>,
{
    let created = ensure_table(client, &plan.table, &plan.families)?;
    on_event(SeedEvent::TableReady {
        table: &plan.table,
        created,
    })?;

    let mut table = Table::new(client, plan.table.as_str());
    let written = table.with_batch(plan.batch, |batch| {
        for row in &plan.rows {
            batch.put(&row.key, &row.columns)?;
        }
        Ok(())
    })?;
    info!(
        table = %plan.table,
        rows = written.rows,
        mutations = written.mutations,
        "batch written"
    );
    on_event(SeedEvent::Written(written))?;

    let mut rows = Vec::new();
    for row in table.scan(plan.scan.clone())? {
        let row = row?;
        on_event(SeedEvent::Row(&row))?;
        rows.push(row);
    }
    info!(table = %plan.table, rows = rows.len(), "scan complete");

    Ok(SeedOutcome {
        table: plan.table.clone(),
        created,
        written,
        rows,
    })
}
