//! 下载流水线依赖的外部协作接口：目录来源与 HTTP 传输。

use async_trait::async_trait;

use super::errors::Result;
use super::models::TrackNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Head,
    Get,
}

impl Verb {
    pub fn other(self) -> Verb {
        match self {
            Verb::Head => Verb::Get,
            Verb::Get => Verb::Head,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Head => "HEAD",
            Verb::Get => "GET",
        }
    }
}

/// 响应体的分块读取。
#[async_trait]
pub trait BodyStream: Send {
    /// 返回 `None` 表示流结束。
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// 只读完响应头后的结果；GET 时附带尚未读取的响应体。
pub struct ProbeResponse {
    pub content_length: Option<u64>,
    /// 原始 ETag 头（含引号）。
    pub etag: Option<String>,
    pub body: Option<Box<dyn BodyStream>>,
}

impl std::fmt::Debug for ProbeResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeResponse")
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .field("body", &self.body.is_some())
            .finish()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn probe(&self, verb: Verb, url: &str) -> Result<ProbeResponse>;
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_tracks(&self, work_id: &str) -> Result<Vec<TrackNode>>;
}
