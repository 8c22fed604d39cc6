//! 日志：控制台输出 + `logs/latest.log`。
//!
//! `latest.log` 超过 10MB 时在启动时归档；正常退出、Ctrl+C 和 panic 时都会刷盘并归档为
//! `logs/log_<时间>.zip`。

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zip::CompressionMethod;
use zip::write::FileOptions;

const LATEST: &str = "latest.log";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
// Windows keeps the handle briefly after the writer thread exits
const FLUSH_SETTLE: Duration = Duration::from_millis(300);

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("tracing subscriber already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
    #[error("log file io: {0}")]
    Io(#[from] io::Error),
    #[error("log archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("log timestamp: {0}")]
    Time(#[from] time::error::Format),
}

#[derive(Clone, Copy, Debug)]
pub struct LogOptions {
    pub debug: bool,
    pub use_color: bool,
}

/// 持有期间日志有效；drop 时刷盘并归档。
pub struct LogSystem {
    state: Arc<LogState>,
}

impl LogSystem {
    pub fn init_with_base(options: LogOptions, base_dir: Option<&Path>) -> Result<Self, LogError> {
        let logs_dir = match base_dir {
            Some(base) => base.join("logs"),
            None => PathBuf::from("logs"),
        };
        fs::create_dir_all(&logs_dir)?;
        if file_len(&logs_dir.join(LATEST)) >= ROTATE_AT_BYTES {
            archive_latest(&logs_dir)?;
        }

        let (file_writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .finish(tracing_appender::rolling::never(&logs_dir, LATEST));

        let console_level = if options.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        };
        let console = fmt::layer()
            .with_target(false)
            .with_ansi(options.use_color)
            .with_writer(io::stdout)
            .with_filter(console_level);
        let file = fmt::layer()
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(LevelFilter::DEBUG);

        tracing_subscriber::registry()
            .with(console)
            .with(file)
            .try_init()?;

        let state = Arc::new(LogState {
            logs_dir,
            guard: Mutex::new(Some(guard)),
            closed: AtomicBool::new(false),
        });
        state.hook_ctrlc();
        state.hook_panic();
        Ok(Self { state })
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.state.close();
    }
}

struct LogState {
    logs_dir: PathBuf,
    guard: Mutex<Option<WorkerGuard>>,
    closed: AtomicBool,
}

impl LogState {
    // 下载中途只能用 Ctrl+C 退出
    fn hook_ctrlc(self: &Arc<Self>) {
        let state = Arc::clone(self);
        let _ = ctrlc::set_handler(move || {
            state.close();
            std::process::exit(130);
        });
    }

    fn hook_panic(self: &Arc<Self>) {
        let state = Arc::clone(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            error!("panic: {info}");
            state.close();
            previous(info);
        }));
    }

    /// 只执行一次。
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut guard) = self.guard.lock() {
            drop(guard.take());
        }
        std::thread::sleep(FLUSH_SETTLE);
        if let Err(err) = archive_latest(&self.logs_dir) {
            eprintln!("failed to archive log: {err}");
        }
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// 把 `latest.log` 压缩为 `log_<时间>.zip` 并删除原文件；空文件直接删除。
fn archive_latest(logs_dir: &Path) -> Result<Option<PathBuf>, LogError> {
    let latest = logs_dir.join(LATEST);
    if !latest.exists() {
        return Ok(None);
    }
    if file_len(&latest) == 0 {
        let _ = fs::remove_file(&latest);
        return Ok(None);
    }

    let stamp = OffsetDateTime::now_utc().format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    let archive = logs_dir.join(format!("log_{stamp}.zip"));

    let mut zip = zip::ZipWriter::new(File::create(&archive)?);
    zip.start_file(
        format!("{stamp}.log"),
        FileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    io::copy(&mut File::open(&latest)?, &mut zip)?;
    zip.finish()?;
    let _ = fs::remove_file(&latest);

    info!("log archived to {}", archive.display());
    Ok(Some(archive))
}
