//! 설정 관리: hbseed.toml 파싱 및 실행 설정
//!
//! [`HbseedConfig`]는 한 번의 실행에 필요한 모든 설정을 담습니다.
//! 기본값은 `localhost:9090`의 `employees1` 테이블에 직원 두 명의 행을 쓰는 데모와 같습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`HBSEED_CONNECTION_HOST=hbase-1` 형식)
//! 3. 설정 파일 (`hbseed.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # fn example() -> Result<(), hbseed_core::error::HbseedError> {
//! use hbseed_core::config::HbseedConfig;
//!
//! // 파일 + 환경변수 오버라이드 + 검증
//! let config = HbseedConfig::load("hbseed.toml")?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HbseedConfig::parse("[connection]\nhost = \"hbase-1\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use crate::error::{ConfigError, HbseedError};
use crate::table::BatchOptions;
use crate::types::{Column, ColumnFamily, DEFAULT_SCAN_CACHING, ScanSpec};

/// `--config`가 없을 때 작업 디렉토리에서 찾는 파일
pub const DEFAULT_CONFIG_FILE: &str = "hbseed.toml";

/// hbseed 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HbseedConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    /// `seed`가 쓰는 행
    #[serde(default = "default_rows")]
    pub rows: Vec<SeedRow>,
}

impl Default for HbseedConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            connection: ConnectionConfig::default(),
            table: TableConfig::default(),
            batch: BatchConfig::default(),
            scan: ScanConfig::default(),
            rows: default_rows(),
        }
    }
}

impl HbseedConfig {
    /// TOML 파일을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HbseedError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본값에 환경변수 오버라이드를 적용하고 검증합니다. 설정 파일이 없을 때 사용합니다.
    pub fn from_env() -> Result<Self, HbseedError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일을 그대로 로드합니다 (환경변수 오버라이드, 검증 없음).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HbseedError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HbseedError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HbseedError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HbseedError> {
        toml::from_str(toml_str).map_err(|e| {
            HbseedError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `HBSEED_{SECTION}_{FIELD}`
    /// 필드 타입으로 파싱되지 않는 값은 변수 이름을 담은 `InvalidValue` 에러가 됩니다.
    pub fn apply_env_overrides(&mut self) -> Result<(), HbseedError> {
        override_string(&mut self.general.log_level, "HBSEED_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "HBSEED_GENERAL_LOG_FORMAT");

        override_string(&mut self.connection.host, "HBSEED_CONNECTION_HOST");
        override_parsed(&mut self.connection.port, "HBSEED_CONNECTION_PORT")?;
        override_parsed(&mut self.connection.transport, "HBSEED_CONNECTION_TRANSPORT")?;
        override_parsed(&mut self.connection.protocol, "HBSEED_CONNECTION_PROTOCOL")?;
        override_parsed(&mut self.connection.timeout_ms, "HBSEED_CONNECTION_TIMEOUT_MS")?;

        override_string(&mut self.table.name, "HBSEED_TABLE_NAME");

        override_parsed(&mut self.batch.size, "HBSEED_BATCH_SIZE")?;
        override_parsed(&mut self.batch.transaction, "HBSEED_BATCH_TRANSACTION")?;
        override_parsed(&mut self.batch.write_to_wal, "HBSEED_BATCH_WRITE_TO_WAL")?;

        override_parsed(&mut self.scan.caching, "HBSEED_SCAN_CACHING")?;
        override_parsed(&mut self.scan.limit, "HBSEED_SCAN_LIMIT")?;
        Ok(())
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HbseedError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.connection.host.trim().is_empty() {
            return Err(invalid("connection.host", "must not be empty"));
        }
        if self.connection.port == 0 {
            return Err(invalid("connection.port", "must be between 1 and 65535"));
        }

        self.table.validate()?;

        if self.scan.caching <= 0 {
            return Err(invalid("scan.caching", "must be greater than 0"));
        }

        for (i, row) in self.rows.iter().enumerate() {
            let field = format!("rows[{i}]");
            if row.key.is_empty() {
                return Err(invalid(&field, "key must not be empty"));
            }
            if row.columns.is_empty() {
                return Err(invalid(&field, "needs at least one column"));
            }
            for name in row.columns.keys() {
                let column = Column::parse(name)
                    .map_err(|e| invalid(&format!("{field}.columns"), e.to_string()))?;
                if !self.table.families.iter().any(|f| f.name == column.family) {
                    return Err(invalid(
                        &format!("{field}.columns"),
                        format!(
                            "column '{name}' uses family '{}' which is not declared in [table]",
                            column.family
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Thrift 게이트웨이 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub transport: ThriftTransport,
    pub protocol: ThriftProtocol,
    /// 연결/읽기/쓰기 타임아웃 (밀리초), 0이면 사용 안 함
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 9090,
            transport: ThriftTransport::Buffered,
            protocol: ThriftProtocol::Binary,
            timeout_ms: 0,
        }
    }
}

impl ConnectionConfig {
    /// `host:port` 주소
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Thrift 프로토콜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThriftProtocol {
    /// 바이너리 프로토콜 (게이트웨이 기본값)
    Binary,
    /// 컴팩트 프로토콜 (게이트웨이를 `-c`로 실행한 경우)
    Compact,
}

/// Thrift 전송 계층
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThriftTransport {
    /// 버퍼 전송 (게이트웨이 기본값)
    Buffered,
    /// 프레임 전송 (게이트웨이를 `-f`로 실행한 경우)
    Framed,
}

impl fmt::Display for ThriftProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Binary => "binary",
            Self::Compact => "compact",
        })
    }
}

impl FromStr for ThriftProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown thrift protocol '{other}'")),
        }
    }
}

impl fmt::Display for ThriftTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Buffered => "buffered",
            Self::Framed => "framed",
        })
    }
}

impl FromStr for ThriftTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buffered" => Ok(Self::Buffered),
            "framed" => Ok(Self::Framed),
            other => Err(format!("unknown thrift transport '{other}'")),
        }
    }
}

/// 대상 테이블과 스키마
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub name: String,
    pub families: Vec<ColumnFamily>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "employees1".to_owned(),
            families: vec![
                ColumnFamily::new("personal_data").with_max_versions(3),
                ColumnFamily::new("job_data"),
            ],
        }
    }
}

impl TableConfig {
    fn validate(&self) -> Result<(), HbseedError> {
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(invalid(
                "table.name",
                "must be non-empty and contain no whitespace",
            ));
        }
        if self.families.is_empty() {
            return Err(invalid("table.families", "needs at least one column family"));
        }
        for (i, family) in self.families.iter().enumerate() {
            let field = format!("table.families[{i}]");
            if family.name.is_empty() || family.name.contains(':') {
                return Err(invalid(&field, "name must be non-empty and contain no ':'"));
            }
            if self.families[..i].iter().any(|f| f.name == family.name) {
                return Err(invalid(
                    &field,
                    format!("duplicate column family '{}'", family.name),
                ));
            }
            if family.max_versions.is_some_and(|v| v <= 0) {
                return Err(invalid(&field, "max_versions must be greater than 0"));
            }
        }
        Ok(())
    }
}

/// 배치 쓰기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// 요청당 뮤테이션 수, 0이면 한 번의 요청으로 모두 전송
    pub size: usize,
    /// 쌓는 도중 실패하면 쌓인 뮤테이션 폐기
    pub transaction: bool,
    pub write_to_wal: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 0,
            transaction: false,
            write_to_wal: true,
        }
    }
}

impl BatchConfig {
    pub fn options(&self) -> BatchOptions {
        BatchOptions {
            batch_size: (self.size > 0).then_some(self.size),
            transaction: self.transaction,
            write_to_wal: self.write_to_wal,
        }
    }
}

/// 스캔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 왕복 한 번에 가져오는 행 수
    pub caching: i32,
    /// 출력할 최대 행 수, 0이면 전체
    pub limit: usize,
    /// 이 `family` 또는 `family:qualifier`로 제한
    pub columns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            caching: DEFAULT_SCAN_CACHING,
            limit: 0,
            columns: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn spec(&self) -> ScanSpec {
        ScanSpec {
            columns: self.columns.clone(),
            caching: self.caching,
            limit: (self.limit > 0).then_some(self.limit),
            ..ScanSpec::default()
        }
    }
}

/// `seed`가 쓰는 한 행: 키와 `family:qualifier` → 값
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRow {
    pub key: String,
    pub columns: BTreeMap<String, String>,
}

impl SeedRow {
    pub fn new<'a>(key: &str, columns: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            key: key.to_owned(),
            columns: columns
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect(),
        }
    }
}

fn default_rows() -> Vec<SeedRow> {
    vec![
        SeedRow::new(
            "row1",
            [
                ("personal_data:name", "John Doe"),
                ("personal_data:age", "30"),
                ("job_data:position", "Engineer"),
            ],
        ),
        SeedRow::new(
            "row2",
            [
                ("personal_data:name", "Jane Smith"),
                ("personal_data:age", "28"),
                ("job_data:position", "Manager"),
            ],
        ),
    ]
}

fn invalid(field: &str, reason: impl Into<String>) -> HbseedError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T>(target: &mut T, env_key: &str) -> Result<(), HbseedError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .parse::<T>()
            .map_err(|e| invalid(env_key, format!("cannot parse {val:?}: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_reproduces_the_demo() {
        let config = HbseedConfig::default();
        assert_eq!(config.connection.addr(), "localhost:9090");
        assert_eq!(config.connection.transport, ThriftTransport::Buffered);
        assert_eq!(config.connection.protocol, ThriftProtocol::Binary);
        assert!(config.connection.timeout().is_none());
        assert_eq!(config.table.name, "employees1");
        assert_eq!(config.table.families.len(), 2);
        assert_eq!(config.table.families[0].max_versions, Some(3));
        assert_eq!(config.table.families[1].max_versions, None);
        assert_eq!(config.rows.len(), 2);
        assert_eq!(config.rows[0].columns["personal_data:name"], "John Doe");
        assert_eq!(config.rows[1].columns["job_data:position"], "Manager");
    }

    #[test]
    fn default_config_passes_validation() {
        HbseedConfig::default()
            .validate()
            .expect("defaults should validate");
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = HbseedConfig::parse("").expect("empty toml should parse");
        assert_eq!(config.table.name, "employees1");
        assert_eq!(config.rows.len(), 2);
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let config = HbseedConfig::parse(
            r#"
[connection]
host = "hbase-thrift.internal"
transport = "framed"
"#,
        )
        .expect("should parse");
        assert_eq!(config.connection.host, "hbase-thrift.internal");
        assert_eq!(config.connection.port, 9090);
        assert_eq!(config.connection.transport, ThriftTransport::Framed);
        assert_eq!(config.connection.protocol, ThriftProtocol::Binary);
    }

    #[test]
    fn custom_table_and_rows() {
        let config = HbseedConfig::parse(
            r#"
[table]
name = "inventory"

[[table.families]]
name = "stock"
max_versions = 1

[[rows]]
key = "sku-1"
columns = { "stock:count" = "12" }
"#,
        )
        .expect("should parse");
        config.validate().expect("should validate");
        assert_eq!(config.table.families, vec![ColumnFamily::new("stock").with_max_versions(1)]);
        assert_eq!(config.rows, vec![SeedRow::new("sku-1", [("stock:count", "12")])]);
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let err = HbseedConfig::parse("[connection\nhost = 1").expect_err("should fail");
        assert!(matches!(
            err,
            HbseedError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn unknown_transport_is_a_parse_error() {
        assert!(HbseedConfig::parse("[connection]\ntransport = \"http\"").is_err());
    }

    #[test]
    fn validate_rejects_bad_log_level() {
        let mut config = HbseedConfig::default();
        config.general.log_level = "loud".to_owned();
        let err = config.validate().expect_err("should fail");
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn validate_rejects_zero_port_and_empty_host() {
        let mut config = HbseedConfig::default();
        config.connection.port = 0;
        assert!(config.validate().is_err());

        let mut config = HbseedConfig::default();
        config.connection.host = "  ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_family() {
        let mut config = HbseedConfig::default();
        config.table.families.push(ColumnFamily::new("job_data"));
        let err = config.validate().expect_err("should fail");
        assert!(err.to_string().contains("duplicate column family"));
    }

    #[test]
    fn validate_rejects_family_with_colon() {
        let mut config = HbseedConfig::default();
        config.table.families[1].name = "job_data:".to_owned();
        config.rows.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_row_with_undeclared_family() {
        let mut config = HbseedConfig::default();
        config.rows[0]
            .columns
            .insert("salary:base".to_owned(), "1".to_owned());
        let err = config.validate().expect_err("should fail");
        assert!(err.to_string().contains("salary"));
    }

    #[test]
    fn validate_rejects_row_with_malformed_column() {
        let mut config = HbseedConfig::default();
        config.rows[1]
            .columns
            .insert("position".to_owned(), "x".to_owned());
        let err = config.validate().expect_err("should fail");
        assert!(err.to_string().contains("rows[1].columns"));
    }

    #[test]
    fn validate_rejects_zero_caching() {
        let mut config = HbseedConfig::default();
        config.scan.caching = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn batch_and_scan_conversions() {
        let mut config = HbseedConfig::default();
        assert_eq!(config.batch.options(), BatchOptions::default());
        assert_eq!(config.scan.spec(), ScanSpec::default());

        config.batch.size = 10;
        config.scan.limit = 5;
        config.scan.caching = 2;
        assert_eq!(config.batch.options().batch_size, Some(10));
        let spec = config.scan.spec();
        assert_eq!(spec.limit, Some(5));
        assert_eq!(spec.caching, 2);
    }

    #[test]
    fn transport_and_protocol_from_str() {
        assert_eq!("FRAMED".parse::<ThriftTransport>(), Ok(ThriftTransport::Framed));
        assert_eq!("compact".parse::<ThriftProtocol>(), Ok(ThriftProtocol::Compact));
        assert!("zlib".parse::<ThriftTransport>().is_err());
    }

    #[test]
    #[serial]
    fn env_override_string_and_number() {
        // SAFETY: #[serial]로 다른 환경변수 테스트와 직렬 실행됩니다.
        unsafe {
            std::env::set_var("HBSEED_CONNECTION_HOST", "hbase-2");
            std::env::set_var("HBSEED_CONNECTION_PORT", "9095");
        }
        let mut config = HbseedConfig::default();
        config.apply_env_overrides().expect("overrides apply");
        unsafe {
            std::env::remove_var("HBSEED_CONNECTION_HOST");
            std::env::remove_var("HBSEED_CONNECTION_PORT");
        }
        assert_eq!(config.connection.addr(), "hbase-2:9095");
    }

    #[test]
    #[serial]
    fn env_override_invalid_value_is_an_error() {
        // SAFETY: #[serial]로 다른 환경변수 테스트와 직렬 실행됩니다.
        unsafe { std::env::set_var("HBSEED_CONNECTION_PORT", "not-a-port") };
        let mut config = HbseedConfig::default();
        let result = config.apply_env_overrides();
        unsafe { std::env::remove_var("HBSEED_CONNECTION_PORT") };

        let err = result.expect_err("unparsable port");
        assert!(matches!(
            err,
            HbseedError::Config(ConfigError::InvalidValue { ref field, .. })
                if field == "HBSEED_CONNECTION_PORT"
        ));
        assert!(err.to_string().contains("not-a-port"));
        assert_eq!(config.connection.port, 9090, "target untouched on error");
    }

    #[test]
    #[serial]
    fn env_override_enum() {
        // SAFETY: #[serial]로 다른 환경변수 테스트와 직렬 실행됩니다.
        unsafe { std::env::set_var("HBSEED_CONNECTION_PROTOCOL", "compact") };
        let mut config = HbseedConfig::default();
        config.apply_env_overrides().expect("overrides apply");
        unsafe { std::env::remove_var("HBSEED_CONNECTION_PROTOCOL") };
        assert_eq!(config.connection.protocol, ThriftProtocol::Compact);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = HbseedConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed = HbseedConfig::parse(&toml_str).expect("parse back");
        assert_eq!(parsed.connection.addr(), config.connection.addr());
        assert_eq!(parsed.table.families, config.table.families);
        assert_eq!(parsed.rows, config.rows);
    }

    #[test]
    fn from_file_not_found() {
        let err = HbseedConfig::from_file("/nonexistent/path/hbseed.toml").expect_err("missing");
        assert!(matches!(
            err,
            HbseedError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
