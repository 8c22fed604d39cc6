//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`     ：数据模型（TrackNode / FlatEntry / DownloadSession 等）
//! - `path_order` ：相对路径排序
//! - `flatten`    ：目录树扁平化
//! - `integrity`  ：长度 + MD5 校验
//! - `metadata`   ：HEAD/GET 元数据协商
//! - `fetch`      ：流式下载
//! - `progress`   ：进度上报与 CLI 进度条
//! - `transport`  ：目录与 HTTP 传输接口
//! - `downloader` ：下载主流程编排

pub mod downloader;
pub mod errors;
pub mod fetch;
pub mod flatten;
pub mod integrity;
pub mod metadata;
pub mod models;
pub mod path_order;
pub mod progress;
pub mod transport;
