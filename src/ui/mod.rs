//! 交互层：命令行参数与标准输入循环。

pub mod noui;
