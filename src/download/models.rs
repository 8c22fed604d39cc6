//! 下载相关的数据模型定义。
//!
//! 包含远端目录节点、扁平化条目、远端文件元数据、下载会话与结果统计。

use serde::{Deserialize, Serialize};

/// `/api/tracks/{code}` 返回的目录节点。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackNode {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub media_download_url: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<TrackNode>>,
}

impl TrackNode {
    #[cfg(test)]
    pub fn folder(title: &str, children: Vec<TrackNode>) -> Self {
        Self {
            kind: "folder".to_string(),
            title: title.to_string(),
            media_download_url: None,
            children: Some(children),
        }
    }

    #[cfg(test)]
    pub fn file(title: &str, url: &str) -> Self {
        Self {
            kind: "audio".to_string(),
            title: title.to_string(),
            media_download_url: Some(url.to_string()),
            children: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == "folder"
    }
}

/// `/api/work/{code}` 的简要信息，仅用于展示。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkInfo {
    #[serde(default)]
    pub title: Option<String>,
    /// 社团名
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    pub relative_path: String,
    pub source_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileMetadata {
    pub content_length: u64,
    pub content_hash_hex: String,
}

/// 一个作品的有序下载序列。
#[derive(Debug, Clone)]
pub struct DownloadSession {
    pub work_id: String,
    pub entries: Vec<FlatEntry>,
    processed: usize,
}

impl DownloadSession {
    pub fn new(work_id: &str, entries: Vec<FlatEntry>) -> Self {
        Self {
            work_id: work_id.to_string(),
            entries,
            processed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// 取下一个条目并返回其从 1 开始的序号。
    pub fn advance(&mut self) -> Option<(usize, FlatEntry)> {
        let entry = self.entries.get(self.processed)?.clone();
        self.processed += 1;
        Some((self.processed, entry))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadResult {
    pub downloaded: u32,
    pub skipped: u32,
    pub retries: u32,
    pub bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_listing_deserializes_from_api_shape() {
        let raw = r#"[
            {"type": "folder", "title": "Track 1", "children": [
                {"type": "audio", "title": "01 Intro.mp3", "hash": "123/0",
                 "mediaDownloadUrl": "https://x/1", "duration": 12.5}
            ]},
            {"type": "image", "title": "cover.jpg", "mediaDownloadUrl": "https://x/2"}
        ]"#;
        let nodes: Vec<TrackNode> = serde_json::from_str(raw).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_folder());
        let child = &nodes[0].children.as_ref().unwrap()[0];
        assert_eq!(child.media_download_url.as_deref(), Some("https://x/1"));
        assert!(!nodes[1].is_folder());
        assert!(nodes[1].children.is_none());
    }

    #[test]
    fn session_counts_from_one() {
        let mut session = DownloadSession::new(
            "123",
            vec![
                FlatEntry {
                    relative_path: "a".into(),
                    source_url: "https://x/a".into(),
                },
                FlatEntry {
                    relative_path: "b".into(),
                    source_url: "https://x/b".into(),
                },
            ],
        );
        assert_eq!(session.advance().map(|(i, _)| i), Some(1));
        assert_eq!(session.advance().map(|(i, e)| (i, e.relative_path)), Some((2, "b".into())));
        assert!(session.advance().is_none());
        assert!(session.advance().is_none());
    }
}
