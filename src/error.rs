//! 错误类型
//!
//! 库内部的可恢复错误。对外的审计记忆接口不会抛出这些错误，
//! 只在日志中记录；CSV 下载会把投递失败返回给调用方。

use std::io;

use thiserror::Error;

/// 键值存储读写失败
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("store file is not a JSON object of strings: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// CSV 导出或下载投递失败
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("record is not a JSON object (index {index})")]
    NotARecord { index: usize },
    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("download backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
