//! 下载主流程编排。
//!
//! 每个文件按 `检查已有 → 下载 → 校验 → 写盘` 处理；任一步出错都会记录、等待并从头重试该文件。
//! 文件严格逐个处理，不并发。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::errors::{DownloadError, Result};
use super::fetch::{FetchProgress, fetch_body};
use super::flatten::{TrackMap, flatten_tracks, to_entries};
use super::integrity::verify;
use super::metadata::{ProbeOrder, resolve};
use super::models::{DownloadResult, DownloadSession, FlatEntry};
use super::progress::ProgressReporter;
use super::transport::{ListingSource, Transport};
use crate::base_system::retry::{RetryPolicy, Sleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Skipped,
    Downloaded(u64),
}

pub struct WorkDownloader {
    listing: Arc<dyn ListingSource>,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl WorkDownloader {
    pub fn new(
        listing: Arc<dyn ListingSource>,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            listing,
            transport,
            sleeper,
            policy,
        }
    }

    /// 拉取并扁平化目录；与单个文件使用同一重试策略。
    pub async fn fetch_listing(
        &self,
        work_id: &str,
        reporter: &mut ProgressReporter,
    ) -> Result<TrackMap> {
        let mut attempt = 0u32;
        loop {
            let listed = match self.listing.fetch_tracks(work_id).await {
                Ok(nodes) => flatten_tracks(&nodes),
                Err(err) => Err(err),
            };
            match listed {
                Ok(map) => return Ok(map),
                Err(err) => {
                    attempt += 1;
                    if !self.policy.should_retry(attempt) {
                        return Err(err);
                    }
                    let delay = self.policy.delay_for(attempt);
                    reporter.retry(&format!("RJ{work_id}"), attempt, &err, delay);
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    pub async fn download_work(
        &self,
        work_id: &str,
        base_dir: &Path,
        reporter: &mut ProgressReporter,
    ) -> Result<DownloadResult> {
        let tracks = self.fetch_listing(work_id, reporter).await?;
        let mut session = DownloadSession::new(work_id, to_entries(&tracks));
        reporter.listed(&session.work_id, session.total());

        let mut result = DownloadResult::default();
        let total = session.total();
        while let Some((index, entry)) = session.advance() {
            let dest = base_dir.join(&entry.relative_path);
            let mut attempt = 0u32;
            loop {
                reporter.entry_started(index, total, &entry.relative_path);
                match self.attempt_entry(&entry, &dest, reporter).await {
                    Ok(EntryOutcome::Skipped) => {
                        result.skipped += 1;
                        break;
                    }
                    Ok(EntryOutcome::Downloaded(bytes)) => {
                        result.downloaded += 1;
                        result.bytes += bytes;
                        break;
                    }
                    Err(err) => {
                        attempt += 1;
                        if !self.policy.should_retry(attempt) {
                            return Err(err);
                        }
                        let delay = self.policy.delay_for(attempt);
                        reporter.retry(&entry.relative_path, attempt, &err, delay);
                        result.retries += 1;
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        reporter.finished(&session.work_id, result);
        Ok(result)
    }

    async fn attempt_entry(
        &self,
        entry: &FlatEntry,
        dest: &Path,
        reporter: &mut ProgressReporter,
    ) -> Result<EntryOutcome> {
        if self.check_existing(entry, dest).await? {
            reporter.already_verified(&entry.relative_path);
            return Ok(EntryOutcome::Skipped);
        }

        // 重新获取元数据，不复用检查阶段的结果
        let resolved = resolve(self.transport.as_ref(), &entry.source_url, ProbeOrder::GetFirst).await?;
        let meta = resolved.metadata;
        let Some(mut body) = resolved.body else {
            return Err(DownloadError::MetadataUnavailable {
                url: entry.source_url.clone(),
                missing: "response body",
            });
        };

        let bytes = {
            let mut on_progress = |p: &FetchProgress| reporter.progress(p);
            fetch_body(
                &entry.source_url,
                body.as_mut(),
                meta.content_length,
                &mut on_progress,
            )
            .await?
        };
        drop(body);

        if !verify(&bytes, meta.content_length, &meta.content_hash_hex) {
            return Err(DownloadError::IntegrityMismatch {
                path: entry.relative_path.clone(),
                expected_len: meta.content_length,
                expected_hash: meta.content_hash_hex,
                actual_len: bytes.len() as u64,
            });
        }

        write_file(dest, &bytes).await?;
        reporter.saved(&entry.relative_path, bytes.len() as u64);
        Ok(EntryOutcome::Downloaded(bytes.len() as u64))
    }

    /// 本地文件存在且与服务器长度/MD5 一致时返回 true。
    async fn check_existing(&self, entry: &FlatEntry, dest: &Path) -> Result<bool> {
        let exists = tokio::fs::try_exists(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        if !exists {
            return Ok(false);
        }

        let meta = resolve(self.transport.as_ref(), &entry.source_url, ProbeOrder::HeadFirst)
            .await?
            .metadata;
        let local = tokio::fs::read(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let ok = verify(&local, meta.content_length, &meta.content_hash_hex);
        if !ok {
            debug!(
                target: "download",
                path = %dest.display(),
                local_len = local.len(),
                remote_len = meta.content_length,
                "本地文件校验失败，重新下载"
            );
        }
        Ok(ok)
    }
}

async fn write_file(dest: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::io(parent, e))?;
    }
    tokio::fs::write(dest, bytes)
        .await
        .map_err(|e| DownloadError::io(PathBuf::from(dest), e))
}
