//! # 文件取证模块（file_forensics）
//!
//! ## 设计思路
//!
//! 回答两个问题：文件“真实是什么”，以及内容“有多随机”。
//!
//! - `catalog`：有序 magic bytes 目录，首个前缀匹配胜出
//! - `entropy`：256 桶直方图上的 Shannon 熵
//! - `mime`：MIME 嗅探协作方（默认 `infer`）
//! - `strings`：可打印字符串提取、十六进制/正则模式搜索
//! - `service`：在 `ForensicsEngine` 上组合出签名、结构、哈希报告
//!
//! ## 实现思路
//!
//! 叶子模块均为无状态纯函数；只有 `service` 依赖引擎持有的配置与协作方。

pub mod catalog;
pub mod entropy;
pub mod mime;
pub mod service;
pub mod strings;

pub use catalog::{detect_type, SignatureCatalog, SignatureEntry, SIGNATURE_WINDOW, UNKNOWN_LABEL};
pub use entropy::{entropy, entropy_with_window};
pub use mime::{InferSniffer, MimeSniffer};
pub use service::{
    possible_mismatch, FileSignatureReport, FileStructureReport, HashVerification,
};
pub use strings::{HexMatch, PatternMatches, TextMatch};
