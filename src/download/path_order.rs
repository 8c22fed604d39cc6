//! 相对路径排序：先按层级（段数），同层级再逐段按字节序比较。
//!
//! 这是处理/展示顺序，不是真正的目录树遍历顺序：同一层的文件总是排在更深的
//! 目录之前，例如 `z` 排在 `a/b` 之前。

use std::cmp::Ordering;
use std::fmt;

pub fn compare_paths(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let depth_a = a.split('/').count();
            let depth_b = b.split('/').count();
            if depth_a != depth_b {
                return depth_a.cmp(&depth_b);
            }
            for (sa, sb) in a.split('/').zip(b.split('/')) {
                if sa != sb {
                    return sa.cmp(sb);
                }
            }
            Ordering::Equal
        }
    }
}

/// `BTreeMap` 的键：按 [`compare_paths`] 排序的相对路径。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey(String);

impl PathKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_paths(Some(&self.0), Some(&other.0))
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
