//! 进度上报与 CLI 进度条管理。
//!
//! 所有状态都会写入 tracing 日志；传入回调时事件交给回调，否则在 stderr 绘制进度条。

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{info, warn};

use super::errors::DownloadError;
use super::fetch::FetchProgress;
use super::models::DownloadResult;

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Listed {
        work_id: String,
        total: usize,
    },
    EntryStarted {
        index: usize,
        total: usize,
        path: String,
    },
    AlreadyVerified {
        path: String,
    },
    Progress(FetchProgress),
    Saved {
        path: String,
        bytes: u64,
    },
    RetryScheduled {
        path: String,
        attempt: u32,
        error: String,
        delay: Duration,
    },
    Finished(DownloadResult),
}

pub type EventCallback = Box<dyn FnMut(&DownloadEvent) + Send>;

pub struct ProgressReporter {
    cb: Option<EventCallback>,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// 无回调时使用 CLI 进度条。
    pub fn new(cb: Option<EventCallback>) -> Self {
        Self { cb, bar: None }
    }

    fn emit(&mut self, event: DownloadEvent) {
        if let Some(cb) = self.cb.as_mut() {
            cb(&event);
        }
    }

    pub(crate) fn listed(&mut self, work_id: &str, total: usize) {
        info!(target: "download", work_id, total, "There are {} files to download.", total);
        self.emit(DownloadEvent::Listed {
            work_id: work_id.to_string(),
            total,
        });
    }

    pub(crate) fn entry_started(&mut self, index: usize, total: usize, path: &str) {
        info!(target: "download", "[{}/{}] {}", index, total, path);
        self.emit(DownloadEvent::EntryStarted {
            index,
            total,
            path: path.to_string(),
        });
    }

    pub(crate) fn already_verified(&mut self, path: &str) {
        info!(target: "download", path, "Already downloaded and checked.");
        self.emit(DownloadEvent::AlreadyVerified {
            path: path.to_string(),
        });
    }

    pub(crate) fn progress(&mut self, progress: &FetchProgress) {
        if self.cb.is_none() {
            let bar = self
                .bar
                .get_or_insert_with(|| new_bar(progress.total_bytes));
            bar.set_position(progress.bytes_done);
            bar.set_message(format!("{}B/s", progress.throughput_label));
        }
        self.emit(DownloadEvent::Progress(progress.clone()));
    }

    pub(crate) fn saved(&mut self, path: &str, bytes: u64) {
        self.finish_bar();
        info!(target: "download", path, bytes, "saved");
        self.emit(DownloadEvent::Saved {
            path: path.to_string(),
            bytes,
        });
    }

    pub(crate) fn retry(&mut self, path: &str, attempt: u32, err: &DownloadError, delay: Duration) {
        self.finish_bar();
        warn!(
            target: "download",
            path,
            attempt,
            kind = err.kind().as_str(),
            "{}",
            err
        );
        warn!(target: "download", "Retry after {} seconds.", delay.as_secs());
        self.emit(DownloadEvent::RetryScheduled {
            path: path.to_string(),
            attempt,
            error: err.to_string(),
            delay,
        });
    }

    pub(crate) fn finished(&mut self, work_id: &str, result: DownloadResult) {
        self.finish_bar();
        info!(
            target: "download",
            work_id,
            downloaded = result.downloaded,
            skipped = result.skipped,
            retries = result.retries,
            "RJ{} done: {} downloaded, {} already present, {} retries, {} transferred.",
            work_id,
            result.downloaded,
            result.skipped,
            result.retries,
            human_bytes(result.bytes)
        );
        self.emit(DownloadEvent::Finished(result));
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish_bar();
    }
}

fn new_bar(total: u64) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{prefix} [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} {msg} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-");

    let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    bar.set_style(style);
    bar.set_prefix("Downloading");
    bar
}

fn human_bytes(bytes: u64) -> String {
    format!("{}B", super::fetch::number_to_unit(bytes as f64))
}
