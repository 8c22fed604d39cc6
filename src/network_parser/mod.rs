//! 远端 API 访问层。

pub mod network;
