//! 에러 타입: 도메인별 에러 정의

/// hbseed 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HbseedError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// HBase 통신 중 발생한 에러
    #[error("hbase error: {0}")]
    Hbase(#[from] HbaseError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일이 존재하지 않음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파일이 올바른 TOML이 아니거나 구조가 맞지 않음
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 사용할 수 없는 설정값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// [`HbaseClient`](crate::client::HbaseClient) 구현체가 반환하는 에러
///
/// Thrift 게이트웨이의 서비스 예외(`IOError`, `IllegalArgument`,
/// `AlreadyExists`)는 각각 별도 variant로 구분됩니다.
/// 호출자는 예상한 예외만 처리하고 나머지는 그대로 전파합니다.
#[derive(Debug, thiserror::Error)]
pub enum HbaseError {
    /// 게이트웨이에 연결할 수 없음
    #[error("failed to connect to {addr}: {reason}")]
    Connection { addr: String, reason: String },

    /// 테이블이 이미 존재하여 `createTable`이 거부됨
    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    /// 테이블이 존재하지 않음
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// 서버가 `IOError`를 보고함
    #[error("server io error: {0}")]
    ServerIo(String),

    /// 서버가 `IllegalArgument`를 보고함
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// 컬럼 이름이 `family:qualifier` 형식이 아님
    #[error("invalid column '{0}': expected 'family:qualifier'")]
    InvalidColumn(String),

    /// 서버(또는 인메모리 저장소)가 모르는 스캐너 ID
    #[error("unknown scanner id: {0}")]
    UnknownScanner(i32),

    /// 연결 이후 발생한 소켓 수준 실패
    #[error("thrift transport error: {0}")]
    Transport(String),

    /// 잘못되었거나 예상하지 못한 메시지
    #[error("thrift protocol error: {0}")]
    Protocol(String),

    /// 서버가 Thrift 애플리케이션 예외로 응답함
    #[error("thrift application error: {0}")]
    Application(String),

    /// `close()` 이후에 클라이언트를 사용함
    #[error("connection already closed")]
    ConnectionClosed,
}

impl HbaseError {
    /// 게이트웨이가 한 번도 응답하지 않은 경우 true를 반환합니다.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
