//! 도메인 타입: 클라이언트 구현체들이 공유하는 데이터 구조
//!
//! 행 키와 셀 값은 HBase와 마찬가지로 바이트열입니다.
//! 컬럼 이름은 Thrift 게이트웨이와 설정 파일 모두 `family:qualifier` 문자열로 다루므로
//! 그대로 문자열로 유지합니다.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HbaseError;

/// 스키마에 지정이 없을 때 패밀리가 유지하는 버전 수
pub const DEFAULT_MAX_VERSIONS: i32 = 3;

/// 스캔에 지정이 없을 때 왕복 한 번에 가져오는 행 수
pub const DEFAULT_SCAN_CACHING: i32 = 1000;

/// 컬럼 패밀리 스키마
///
/// `name`은 Thrift 게이트웨이가 붙이는 `:` 없이 저장합니다.
/// `None`으로 둔 필드는 서버 기본값을 따릅니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamily {
    /// 패밀리 이름 (예: `personal_data`)
    pub name: String,
    /// 셀당 유지할 버전 수
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_versions: Option<i32>,
    /// 압축 코덱 이름 (`NONE`, `GZ`, `SNAPPY` 등)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    /// 인메모리 블록 캐시 계층에 유지할지 여부
    #[serde(default)]
    pub in_memory: bool,
    /// 블룸 필터 타입 (`NONE`, `ROW`, `ROWCOL`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bloom_filter_type: Option<String>,
    /// 읽기 시 블록 캐시 사용 여부
    #[serde(default)]
    pub block_cache_enabled: bool,
    /// 셀 TTL (초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<i32>,
}

impl ColumnFamily {
    /// 모든 옵션을 서버 기본값에 맡기는 패밀리를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_versions: None,
            compression: None,
            in_memory: false,
            bloom_filter_type: None,
            block_cache_enabled: false,
            time_to_live: None,
        }
    }

    pub fn with_max_versions(mut self, versions: i32) -> Self {
        self.max_versions = Some(versions);
        self
    }

    /// 서버가 실제로 유지할 버전 수
    pub fn effective_max_versions(&self) -> i32 {
        self.max_versions.unwrap_or(DEFAULT_MAX_VERSIONS)
    }
}

/// 컬럼 주소: `family:qualifier`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column {
    pub family: String,
    pub qualifier: String,
}

impl Column {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }

    /// `family:qualifier`를 파싱합니다. qualifier는 비어도 되지만 family는 안 됩니다.
    pub fn parse(name: &str) -> Result<Self, HbaseError> {
        match name.split_once(':') {
            Some((family, qualifier)) if !family.is_empty() => Ok(Self::new(family, qualifier)),
            _ => Err(HbaseError::InvalidColumn(name.to_owned())),
        }
    }
}

impl FromStr for Column {
    type Err = HbaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.qualifier)
    }
}

/// 행의 한 컬럼에 대한 단일 변경
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Put { column: Column, value: Vec<u8> },
    Delete { column: Column },
}

impl Mutation {
    pub fn put(column: Column, value: impl Into<Vec<u8>>) -> Self {
        Self::Put {
            column,
            value: value.into(),
        }
    }

    pub fn delete(column: Column) -> Self {
        Self::Delete { column }
    }

    pub fn column(&self) -> &Column {
        match self {
            Self::Put { column, .. } | Self::Delete { column } => column,
        }
    }
}

/// 한 행에 대해 모아 둔 뮤테이션. HBase가 원자적으로 적용합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMutations {
    pub row: Vec<u8>,
    pub mutations: Vec<Mutation>,
    /// WAL(write-ahead log) 기록 여부
    pub write_to_wal: bool,
}

/// 셀의 최신 버전
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: Vec<u8>,
    pub timestamp: i64,
}

impl Cell {
    pub fn new(value: impl Into<Vec<u8>>, timestamp: i64) -> Self {
        Self {
            value: value.into(),
            timestamp,
        }
    }
}

/// get 또는 scan이 반환한 한 행. 컬럼은 이름순으로 정렬됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub key: Vec<u8>,
    pub columns: BTreeMap<String, Cell>,
}

impl Row {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            columns: BTreeMap::new(),
        }
    }

    /// UTF-8로 디코딩한 행 키 (잘못된 시퀀스는 대체 문자로 치환)
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// `column`(`family:qualifier`)의 원시 값
    pub fn value(&self, column: &str) -> Option<&[u8]> {
        self.columns.get(column).map(|cell| cell.value.as_slice())
    }

    /// UTF-8로 디코딩한 `column` 값 (잘못된 시퀀스는 치환)
    pub fn text(&self, column: &str) -> Option<Cow<'_, str>> {
        self.value(column).map(String::from_utf8_lossy)
    }

    /// 컬럼 이름 → 디코딩된 값 (컬럼 순서)
    pub fn text_map(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .map(|(name, cell)| (name.clone(), String::from_utf8_lossy(&cell.value).into_owned()))
            .collect()
    }
}

/// `<key> {family:qualifier=value, ...}` 형식으로 출력합니다.
impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.key_lossy())?;
        for (i, (name, cell)) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, String::from_utf8_lossy(&cell.value))?;
        }
        write!(f, "}}")
    }
}

/// 스캔 조건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSpec {
    /// 시작 행 키 (포함). `None`이면 테이블 처음부터
    pub start_row: Option<Vec<u8>>,
    /// 끝 행 키 (미포함). `None`이면 테이블 끝까지
    pub stop_row: Option<Vec<u8>>,
    /// 이 `family` 또는 `family:qualifier`로 제한. 비어 있으면 전체
    pub columns: Vec<String>,
    /// 왕복 한 번에 가져오는 행 수
    pub caching: i32,
    /// 이 개수만큼 읽은 뒤 중단
    pub limit: Option<usize>,
}

impl Default for ScanSpec {
    fn default() -> Self {
        Self {
            start_row: None,
            stop_row: None,
            columns: Vec::new(),
            caching: DEFAULT_SCAN_CACHING,
            limit: None,
        }
    }
}

impl ScanSpec {
    /// `key`가 시작/끝 범위 안에 있는지 확인합니다.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        let after_start = self.start_row.as_deref().is_none_or(|start| key >= start);
        let before_stop = self
            .stop_row
            .as_deref()
            .is_none_or(|stop| stop.is_empty() || key < stop);
        after_start && before_stop
    }

    /// `column`이 컬럼 필터에 선택되는지 확인합니다.
    pub fn selects_column(&self, column: &str) -> bool {
        if self.columns.is_empty() {
            return true;
        }
        self.columns.iter().any(|wanted| {
            if wanted.contains(':') {
                wanted == column
            } else {
                column
                    .split_once(':')
                    .is_some_and(|(family, _)| family == wanted)
            }
        })
    }
}

/// 서버 측 스캐너 핸들
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScannerId(pub i32);

impl fmt::Display for ScannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
