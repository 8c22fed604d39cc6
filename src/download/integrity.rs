//! 基于长度与 MD5 的完整性校验。

use md5::{Digest, Md5};

/// 去掉 ETag 的 `W/` 前缀与首尾引号。
pub fn normalize_etag(raw: &str) -> &str {
    let raw = raw.trim();
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    match (raw.find('"'), raw.rfind('"')) {
        (Some(first), Some(last)) if first < last => &raw[first + 1..last],
        _ => raw.trim_matches('"'),
    }
}

/// 长度与 MD5 都严格相等时返回 true；哈希无法解码时视为不匹配。
pub fn verify(bytes: &[u8], expected_length: u64, expected_hash_hex: &str) -> bool {
    if bytes.len() as u64 != expected_length {
        return false;
    }
    let Ok(expected) = hex::decode(normalize_etag(expected_hash_hex)) else {
        return false;
    };
    if expected.len() != 16 {
        return false;
    }
    let actual = Md5::digest(bytes);
    expected.as_slice() == actual.as_slice()
}
