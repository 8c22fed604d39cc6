//! 流式下载：整文件读入预分配缓冲区，每个分块后上报进度。

use std::io;
use std::time::{Duration, Instant};

use super::errors::{DownloadError, Result};
use super::transport::BodyStream;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchProgress {
    pub bytes_done: u64,
    pub total_bytes: u64,
    pub bytes_per_sec: f64,
    pub eta: Duration,
    /// 例如 `"1.50 M"`，调用方自行追加单位。
    pub throughput_label: String,
}

/// 读取响应体直到填满 `expected_length` 或流提前结束。
///
/// 提前结束时返回较短的缓冲区，由随后的完整性校验判定失败。
pub async fn fetch_body(
    url: &str,
    body: &mut dyn BodyStream,
    expected_length: u64,
    on_progress: &mut (dyn FnMut(&FetchProgress) + Send),
) -> Result<Vec<u8>> {
    let capacity = usize::try_from(expected_length).map_err(|_| too_large(url, expected_length))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| too_large(url, expected_length))?;

    let start = Instant::now();
    while buf.len() < capacity {
        let Some(chunk) = body.next_chunk().await? else {
            break;
        };
        let room = capacity - buf.len();
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);

        let done = buf.len() as u64;
        let secs = start.elapsed().as_secs_f64();
        let bytes_per_sec = if secs > 0.0 { done as f64 / secs } else { 0.0 };
        on_progress(&FetchProgress {
            bytes_done: done,
            total_bytes: expected_length,
            bytes_per_sec,
            eta: eta(expected_length - done, bytes_per_sec),
            throughput_label: number_to_unit(bytes_per_sec),
        });
    }

    Ok(buf)
}

fn eta(remaining: u64, bytes_per_sec: f64) -> Duration {
    if remaining == 0 || bytes_per_sec <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(remaining as f64 / bytes_per_sec).unwrap_or(Duration::MAX)
}

fn too_large(url: &str, len: u64) -> DownloadError {
    DownloadError::io(
        url,
        io::Error::new(
            io::ErrorKind::OutOfMemory,
            format!("cannot buffer {len} bytes in memory"),
        ),
    )
}

/// 1024 进制的简短数值，保留最多四个字符，例如 `1.50 K`、`100 M`。
pub fn number_to_unit(mut num: f64) -> String {
    const PREFIXES: [&str; 5] = ["", "K", "M", "G", "T"];
    let mut i = 0;
    while i < PREFIXES.len() - 1 && num >= 1024.0 {
        num /= 1024.0;
        i += 1;
    }
    let mut text = format!("{num:.2}");
    while text.ends_with('.') || (text.contains('.') && text.len() > 4) {
        text.pop();
    }
    format!("{} {}", text, PREFIXES[i])
}
