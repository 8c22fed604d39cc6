//! 远端文件元数据（长度 + ETag 中的 MD5）解析。
//!
//! 先发主请求；若缺少 `Content-Length` 或 `ETag`，再用另一种方法补齐。
//! 以 GET 为主请求时，打开的响应体一并返回，下载时无需再请求一次。

use tracing::debug;

use super::errors::{DownloadError, Result};
use super::integrity::normalize_etag;
use super::models::RemoteFileMetadata;
use super::transport::{BodyStream, Transport, Verb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOrder {
    HeadFirst,
    GetFirst,
}

impl ProbeOrder {
    fn primary(self) -> Verb {
        match self {
            ProbeOrder::HeadFirst => Verb::Head,
            ProbeOrder::GetFirst => Verb::Get,
        }
    }
}

pub struct Resolved {
    pub metadata: RemoteFileMetadata,
    pub body: Option<Box<dyn BodyStream>>,
}

pub async fn resolve(transport: &dyn Transport, url: &str, order: ProbeOrder) -> Result<Resolved> {
    let primary = order.primary();
    let first = transport.probe(primary, url).await?;
    let mut length = first.content_length;
    let mut etag = first.etag.as_deref().map(normalize_etag).map(str::to_string);
    let mut body = first.body;

    if length.is_none() || etag.is_none() {
        let fallback = primary.other();
        debug!(
            target: "download",
            url,
            has_length = length.is_some(),
            has_etag = etag.is_some(),
            "{} 响应缺少元数据，改用 {}",
            primary.as_str(),
            fallback.as_str()
        );
        let second = transport.probe(fallback, url).await?;
        if length.is_none() {
            length = second.content_length;
        }
        if etag.is_none() {
            etag = second.etag.as_deref().map(normalize_etag).map(str::to_string);
        }
        if body.is_none() {
            body = second.body;
        }
    }

    match (length, etag) {
        (Some(content_length), Some(content_hash_hex)) => Ok(Resolved {
            metadata: RemoteFileMetadata {
                content_length,
                content_hash_hex,
            },
            body,
        }),
        (None, Some(_)) => Err(unavailable(url, "Content-Length")),
        (Some(_), None) => Err(unavailable(url, "ETag")),
        (None, None) => Err(unavailable(url, "Content-Length and ETag")),
    }
}

fn unavailable(url: &str, missing: &'static str) -> DownloadError {
    DownloadError::MetadataUnavailable {
        url: url.to_string(),
        missing,
    }
}
