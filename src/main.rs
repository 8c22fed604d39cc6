//! asmr.one 音声作品下载器。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/账号/日志/重试/作品编号等基础设施
//! - `download`：下载流程编排（拉目录、扁平化、元数据、流式下载、校验、重试）
//! - `network_parser`：asmr.one API 客户端与登录会话
//! - `ui`：命令行交互

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;

mod base_system;
mod download;
mod network_parser;
mod ui;

use base_system::config::load_or_create_with_base;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};

#[derive(Debug, Parser)]
#[command(name = "asmr-downloader", version)]
#[command(about = "Download audio works from asmr.one with MD5 verification")]
struct Cli {
    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 关闭控制台日志的 ANSI 颜色（重定向到文件时使用）
    #[arg(long, default_value_t = false)]
    no_color: bool,

    /// 数据目录路径（用于存放 config.yml、account.yml 和 logs）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 覆盖配置中的保存目录（本次运行有效）
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// 作品编号（xxx 或 RJxxx）；不填则进入交互模式
    codes: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.as_deref();
    if let Some(dir) = data_dir {
        std::fs::create_dir_all(dir)?;
    }
    let _log = init_logging(
        LogOptions {
            debug: cli.debug,
            use_color: !cli.no_color,
        },
        data_dir,
    )?;

    let mut config =
        load_or_create_with_base::<Config>(data_dir).map_err(|e| anyhow!(e.to_string()))?;
    if let Some(dir) = cli.save_dir {
        config.save_path = dir.to_string_lossy().into_owned();
    }

    info!(target: "startup", "当前版本: v{}", env!("CARGO_PKG_VERSION"));
    ui::noui::run(&config, data_dir, &cli.codes)
}

fn init_logging(options: LogOptions, base_dir: Option<&Path>) -> Result<LogSystem> {
    LogSystem::init_with_base(options, base_dir).map_err(|e| anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_feed_log_options() {
        let cli = Cli::try_parse_from(["asmr-downloader", "--no-color", "--debug", "RJ123456"]).unwrap();
        assert!(cli.no_color);
        assert!(cli.debug);
        assert_eq!(cli.codes, vec!["RJ123456".to_string()]);

        let cli = Cli::try_parse_from(["asmr-downloader"]).unwrap();
        assert!(!cli.no_color);
        assert!(cli.codes.is_empty());
    }
}
