//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息，以及文件名清理。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};
use super::retry::{Backoff, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 路径配置
    #[serde(default)]
    pub save_path: String,

    // 网络配置
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // 重试配置
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default)]
    pub retry_max_delay_secs: u64,
    #[serde(default)]
    pub max_attempts: u32,

    // 账号配置
    #[serde(default = "default_true")]
    pub remember_account: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: String::new(),
            api_base: default_api_base(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
            retry_delay_secs: default_retry_delay_secs(),
            retry_max_delay_secs: 0,
            max_attempts: 0,
            remember_account: default_true(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 8] = [
            FieldMeta {
                name: "save_path",
                description: "保存路径（留空为当前目录），作品保存在其下的 RJxxxx 目录",
            },
            FieldMeta {
                name: "api_base",
                description: "API 根地址",
            },
            FieldMeta {
                name: "connect_timeout_secs",
                description: "连接超时时间（秒），传输过程不设超时",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent",
            },
            FieldMeta {
                name: "retry_delay_secs",
                description: "失败后重试前的等待时间（秒）",
            },
            FieldMeta {
                name: "retry_max_delay_secs",
                description: "重试等待上限（秒）；大于 retry_delay_secs 时每次失败等待时间翻倍，0 表示固定间隔",
            },
            FieldMeta {
                name: "max_attempts",
                description: "单个文件最大尝试次数，0 表示无限重试",
            },
            FieldMeta {
                name: "remember_account",
                description: "是否将账号密码保存到 account.yml",
            },
        ];
        &FIELDS
    }
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.save_path)
        }
    }

    /// 作品保存目录：`<save_path>/RJ<code>`。
    pub fn work_dir(&self, code: &str) -> PathBuf {
        self.default_save_dir()
            .join(format!("RJ{}", safe_fs_name(code)))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base = Duration::from_secs(self.retry_delay_secs);
        let backoff = if self.retry_max_delay_secs > self.retry_delay_secs {
            Backoff::Exponential {
                base,
                max: Duration::from_secs(self.retry_max_delay_secs),
            }
        } else {
            Backoff::Fixed(base)
        };
        RetryPolicy {
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
            backoff,
        }
    }
}

/// 将文件系统不允许的字符替换为 `_`，只作用于单个路径段。
///
/// 替换集合取各平台的并集（`< > : " / \ | ? *` 与控制字符），
/// 保证同一份目录在任何系统上得到相同的相对路径。
/// 空名以及 `.`、`..` 变为 `_`，结果不会跳出所在目录。
pub fn safe_fs_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_ascii_control() => '_',
            _ => ch,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "https://api.asmr.one/api".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("asmr-downloader/", env!("CARGO_PKG_VERSION")).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_characters_become_underscore() {
        assert_eq!(safe_fs_name(r#"a<b>c:d"e/f\g|h?i*j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(safe_fs_name("tab\there\u{7f}"), "tab_here_");
        assert_eq!(safe_fs_name("01 Intro.mp3"), "01 Intro.mp3");
    }

    #[test]
    fn empty_and_dot_segments_become_underscore() {
        assert_eq!(safe_fs_name(""), "_");
        assert_eq!(safe_fs_name("  "), "_");
        assert_eq!(safe_fs_name("."), "_");
        assert_eq!(safe_fs_name(".."), "_");
        assert_eq!(safe_fs_name("..."), "...");
        assert_eq!(safe_fs_name(".hidden"), ".hidden");
    }

    #[test]
    fn sanitizing_is_idempotent_and_never_adds_separators() {
        for raw in ["SE/なし", "a\\b", "what?.wav", "ok", "\u{0}\u{1f}", "「本編」"] {
            let once = safe_fs_name(raw);
            assert_eq!(safe_fs_name(&once), once);
            assert!(!once.contains('/'));
            assert!(!once.contains('\\'));
            assert_eq!(once.chars().count(), raw.chars().count());
        }
    }

    #[test]
    fn zero_max_attempts_means_unbounded() {
        let cfg = Config::default();
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_secs(10)));

        let cfg = Config {
            max_attempts: 3,
            ..Config::default()
        };
        assert_eq!(cfg.retry_policy().max_attempts, Some(3));
    }

    #[test]
    fn max_delay_above_base_switches_to_exponential() {
        let cfg = Config {
            retry_delay_secs: 10,
            retry_max_delay_secs: 60,
            ..Config::default()
        };
        let policy = cfg.retry_policy();
        assert_eq!(
            policy.backoff,
            Backoff::Exponential {
                base: Duration::from_secs(10),
                max: Duration::from_secs(60),
            }
        );
        assert_eq!(policy.delay_for(3), Duration::from_secs(40));
        assert_eq!(policy.delay_for(4), Duration::from_secs(60));

        let cfg = Config {
            retry_max_delay_secs: 5,
            ..Config::default()
        };
        assert_eq!(cfg.retry_policy().backoff, Backoff::Fixed(Duration::from_secs(10)));
    }

    #[test]
    fn work_dir_is_prefixed() {
        let cfg = Config {
            save_path: "/data".into(),
            ..Config::default()
        };
        assert_eq!(cfg.work_dir("123456"), PathBuf::from("/data/RJ123456"));
    }
}
