//! CLI-specific error types and exit code mapping

use hbseed_core::error::{HbaseError, HbseedError};

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// The Thrift gateway could not be reached.
    #[error("gateway not reachable: {0}")]
    Connection(String),

    /// An HBase operation failed after the connection was established.
    #[error("hbase error: {0}")]
    Hbase(HbaseError),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                  |
    /// |------|--------------------------|
    /// | 0    | Success                  |
    /// | 1    | HBase / command error    |
    /// | 2    | Configuration error      |
    /// | 3    | Gateway unreachable      |
    /// | 10   | IO error                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Connection(_) => 3,
            Self::Io(_) => 10,
            Self::Hbase(_) | Self::Command(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

impl From<HbaseError> for CliError {
    fn from(e: HbaseError) -> Self {
        if e.is_connection() {
            Self::Connection(e.to_string())
        } else {
            Self::Hbase(e)
        }
    }
}

impl From<HbseedError> for CliError {
    fn from(e: HbseedError) -> Self {
        match e {
            HbseedError::Config(e) => Self::Config(e.to_string()),
            HbseedError::Hbase(e) => e.into(),
            HbseedError::Io(e) => Self::Io(e),
        }
    }
}
