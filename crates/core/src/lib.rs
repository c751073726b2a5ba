#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod seed;
pub mod table;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

pub use client::HbaseClient;
pub use config::{HbseedConfig, SeedRow, ThriftProtocol, ThriftTransport};
pub use error::{ConfigError, HbaseError, HbseedError};
pub use memory::MemoryClient;
pub use seed::{SeedEvent, SeedOutcome, SeedPlan};
pub use table::{Batch, BatchOptions, BatchStats, Scanner, Table};
pub use types::{Cell, Column, ColumnFamily, Mutation, Row, RowMutations, ScanSpec, ScannerId};
