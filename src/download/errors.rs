//! 下载流水线的错误类型。
//!
//! 每一步（目录拉取、元数据解析、下载、校验、写盘）都有独立的变体，
//! 调度层据此记录错误种类；目前所有种类都走同一条重试路径。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("metadata unavailable for {url}: missing {missing}")]
    MetadataUnavailable { url: String, missing: &'static str },

    #[error("integrity check failed for {path}: expected {expected_len} bytes (md5 {expected_hash}), got {actual_len} bytes")]
    IntegrityMismatch {
        path: String,
        expected_len: u64,
        expected_hash: String,
        actual_len: u64,
    },

    #[error("malformed track listing: node '{title}' has no {field}")]
    MalformedListing { title: String, field: &'static str },

    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("authentication failed: {0}")]
    Auth(String),
}

/// 错误种类：瞬时（网络、校验）或永久（结构性问题）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Permanent => "permanent",
        }
    }
}

impl DownloadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }

    /// 分类仅用于日志；重试策略不区分种类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::MalformedListing { .. } | DownloadError::Auth(_) => {
                ErrorKind::Permanent
            }
            DownloadError::Status { status, .. } => {
                if (400..500).contains(status) && *status != 408 && *status != 429 {
                    ErrorKind::Permanent
                } else {
                    ErrorKind::Transient
                }
            }
            DownloadError::Http(_)
            | DownloadError::MetadataUnavailable { .. }
            | DownloadError::IntegrityMismatch { .. }
            | DownloadError::Io { .. } => ErrorKind::Transient,
        }
    }
}

pub type Result<T, E = DownloadError> = std::result::Result<T, E>;
