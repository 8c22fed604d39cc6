//! 目录树扁平化：把嵌套的 TrackNode 转成有序的「相对路径 → 下载地址」映射。

use std::collections::BTreeMap;

use super::errors::{DownloadError, Result};
use super::models::{FlatEntry, TrackNode};
use super::path_order::PathKey;
use crate::base_system::context::safe_fs_name;

pub type TrackMap = BTreeMap<PathKey, String>;

pub fn flatten_tracks(nodes: &[TrackNode]) -> Result<TrackMap> {
    let mut out = TrackMap::new();
    walk(nodes, "", &mut out)?;
    Ok(out)
}

fn walk(nodes: &[TrackNode], prefix: &str, out: &mut TrackMap) -> Result<()> {
    for node in nodes {
        let name = safe_fs_name(&node.title);
        if node.is_folder() {
            let children = node
                .children
                .as_deref()
                .ok_or_else(|| malformed(node, "children"))?;
            walk(children, &format!("{prefix}{name}/"), out)?;
        } else {
            let url = node
                .media_download_url
                .as_ref()
                .ok_or_else(|| malformed(node, "mediaDownloadUrl"))?;
            // 同名文件后者覆盖前者
            out.insert(PathKey::new(format!("{prefix}{name}")), url.clone());
        }
    }
    Ok(())
}

fn malformed(node: &TrackNode, field: &'static str) -> DownloadError {
    DownloadError::MalformedListing {
        title: node.title.clone(),
        field,
    }
}

pub fn to_entries(map: &TrackMap) -> Vec<FlatEntry> {
    map.iter()
        .map(|(path, url)| FlatEntry {
            relative_path: path.as_str().to_string(),
            source_url: url.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(map: &TrackMap) -> Vec<&str> {
        map.keys().map(PathKey::as_str).collect()
    }

    #[test]
    fn single_folder_single_file() {
        let nodes = vec![TrackNode::folder(
            "Track 1",
            vec![TrackNode::file("01 Intro.mp3", "https://x/1")],
        )];
        let entries = to_entries(&flatten_tracks(&nodes).unwrap());
        assert_eq!(
            entries,
            vec![FlatEntry {
                relative_path: "Track 1/01 Intro.mp3".into(),
                source_url: "https://x/1".into(),
            }]
        );
    }

    #[test]
    fn titles_are_sanitized_per_segment() {
        let nodes = vec![TrackNode::folder(
            "SE/BGM: on",
            vec![TrackNode::file("what?.wav", "https://x/2")],
        )];
        let map = flatten_tracks(&nodes).unwrap();
        assert_eq!(paths(&map), vec!["SE_BGM_ on/what_.wav"]);
    }

    #[test]
    fn order_is_by_depth_then_segments() {
        let nodes = vec![
            TrackNode::folder(
                "mp3",
                vec![
                    TrackNode::folder("extra", vec![TrackNode::file("b.mp3", "u4")]),
                    TrackNode::file("b.mp3", "u3"),
                    TrackNode::file("a.mp3", "u2"),
                ],
            ),
            TrackNode::file("readme.txt", "u1"),
        ];
        let map = flatten_tracks(&nodes).unwrap();
        assert_eq!(
            paths(&map),
            vec!["readme.txt", "mp3/a.mp3", "mp3/b.mp3", "mp3/extra/b.mp3"]
        );
    }

    #[test]
    fn flattening_is_deterministic() {
        let nodes = vec![
            TrackNode::folder("B", vec![TrackNode::file("2", "u2"), TrackNode::file("1", "u1")]),
            TrackNode::folder("A", vec![TrackNode::file("3", "u3")]),
        ];
        let first = to_entries(&flatten_tracks(&nodes).unwrap());
        let second = to_entries(&flatten_tracks(&nodes).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_paths_keep_the_last_url() {
        let nodes = vec![
            TrackNode::file("a:b", "first"),
            TrackNode::file("a?b", "second"),
        ];
        let map = flatten_tracks(&nodes).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&PathKey::from("a_b")).map(String::as_str), Some("second"));
    }

    #[test]
    fn hostile_titles_stay_inside_the_work_dir() {
        let nodes = vec![
            TrackNode::folder("", vec![TrackNode::file("a.mp3", "u1")]),
            TrackNode::folder("..", vec![TrackNode::file("b.mp3", "u2")]),
            TrackNode::folder(".", vec![TrackNode::file("..", "u3")]),
            TrackNode::file("/etc/passwd", "u4"),
        ];
        let map = flatten_tracks(&nodes).unwrap();
        assert_eq!(
            paths(&map),
            vec!["_etc_passwd", "_/_", "_/a.mp3", "_/b.mp3"]
        );

        let base = std::path::Path::new("/data/RJ1");
        for entry in to_entries(&map) {
            let dest = base.join(&entry.relative_path);
            assert!(dest.starts_with(base), "{}", dest.display());
            assert!(
                dest.components()
                    .all(|c| !matches!(c, std::path::Component::ParentDir)),
                "{}",
                dest.display()
            );
        }
    }

    #[test]
    fn folder_without_children_is_malformed() {
        let mut folder = TrackNode::folder("Disc 1", vec![]);
        folder.children = None;
        let err = flatten_tracks(&[folder]).unwrap_err();
        assert!(matches!(
            err,
            DownloadError::MalformedListing { field: "children", .. }
        ));
    }

    #[test]
    fn file_without_url_is_malformed() {
        let mut file = TrackNode::file("01.mp3", "u");
        file.media_download_url = None;
        let err = flatten_tracks(&[TrackNode::folder("d", vec![file])]).unwrap_err();
        assert!(matches!(
            err,
            DownloadError::MalformedListing { field: "mediaDownloadUrl", ref title } if title == "01.mp3"
        ));
    }
}
