//! 作品编号（RJ 号）解析与规范化。

use regex::Regex;
use std::sync::OnceLock;

static RE_RJ: OnceLock<Regex> = OnceLock::new();
static RE_WORK_PATH: OnceLock<Regex> = OnceLock::new();

fn re_rj() -> &'static Regex {
    RE_RJ.get_or_init(|| Regex::new(r"(?i)\bRJ([0-9]+)\b").expect("compile RE_RJ"))
}

fn re_work_path() -> &'static Regex {
    RE_WORK_PATH.get_or_init(|| Regex::new(r"(?i)/work/([0-9]+)").expect("compile RE_WORK_PATH"))
}

/// 返回不带 `RJ` 前缀的纯数字编号；无法识别时返回 `None`。
///
/// 接受 `123456`、`RJ123456`（大小写不敏感）以及包含二者之一的链接。
pub fn parse_work_code(input: &str) -> Option<String> {
    let trimmed = input.trim().to_uppercase();
    if trimmed.is_empty() {
        return None;
    }

    let bare = trimmed.strip_prefix("RJ").unwrap_or(&trimmed);
    if !bare.is_empty() && bare.chars().all(|c| c.is_ascii_digit()) {
        return Some(bare.to_string());
    }

    // 粘贴的是链接或带其它文字时，尝试从中提取
    if let Some(caps) = re_rj().captures(&trimmed) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    if let Some(caps) = re_work_path().captures(&trimmed) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    None
}
