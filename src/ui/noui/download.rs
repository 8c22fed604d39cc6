use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::warn;

use crate::base_system::context::Config;
use crate::base_system::retry::TokioSleeper;
use crate::download::downloader::WorkDownloader;
use crate::download::models::{DownloadResult, WorkInfo};
use crate::download::progress::ProgressReporter;
use crate::network_parser::network::AuthedClient;

pub(super) async fn download_work(
    client: &AuthedClient,
    config: &Config,
    code: &str,
) -> Result<DownloadResult> {
    let start_time = Instant::now();

    // 作品信息只用于展示，拿不到不影响下载
    match client.get_work(code).await {
        Ok(info) => print_banner(code, &info),
        Err(err) => warn!(target: "noui", "获取作品信息失败: RJ{}: {}", code, err),
    }

    let dest = config.work_dir(code);
    println!("保存到: {}", dest.display());

    let shared = Arc::new(client.clone());
    let downloader = WorkDownloader::new(
        shared.clone(),
        shared,
        Arc::new(TokioSleeper),
        config.retry_policy(),
    );
    let mut reporter = ProgressReporter::new(None);
    let result = downloader
        .download_work(code, &dest, &mut reporter)
        .await
        .with_context(|| format!("下载失败: RJ{}", code))?;

    println!("耗时: {:.1}s\n", start_time.elapsed().as_secs_f64());
    Ok(result)
}

fn print_banner(code: &str, info: &WorkInfo) {
    for line in banner_lines(code, info) {
        println!("{line}");
    }
}

fn banner_lines(code: &str, info: &WorkInfo) -> Vec<String> {
    let id = info
        .source_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("RJ{code}"));
    let mut lines = vec![format!("\n作品: {}", id)];
    if let Some(title) = info.title.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("标题: {}", title));
    }
    if let Some(circle) = info.name.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("社团: {}", circle));
    }
    lines
}
