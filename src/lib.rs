//! # 取证信号分析引擎 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              调用方 (CLI / 外层服务)                      │
//! │        字节输入  ──→  报告 / PNG 字节 / ForensicError     │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕        ForensicsEngine（只读配置 + 协作方）       │
//! │                                                          │
//! │  ┌─ error ────────── ForensicError (统一错误类型)         │
//! │  ├─ config ───────── ForensicsConfig (JSON，启动时加载)   │
//! │  ├─ hashing ──────── ContentHasher / DigestHasher        │
//! │  │                                                       │
//! │  ├─ file_forensics   签名目录·熵·MIME·字符串·模式搜索     │
//! │  │                                                       │
//! │  └─ image_forensics  编解码·噪声·颜色·块指纹·ELA·压缩史   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `ForensicError` |
//! | [`config`] | 全部可调阈值与上限，加载与校验 |
//! | [`engine`] | `ForensicsEngine`：持有配置与外部协作方 |
//! | [`hashing`] | 按算法名计算十六进制摘要 |
//! | [`file_forensics`] | 文件类型识别、熵、结构、字符串与模式搜索 |
//! | [`image_forensics`] | 像素级取证算子、EXIF 与 JPEG 结构、字节级编排 |

pub mod config;
pub mod engine;
pub mod error;
pub mod file_forensics;
pub mod hashing;
pub mod image_forensics;

pub use config::ForensicsConfig;
pub use engine::ForensicsEngine;
pub use error::ForensicError;
pub use file_forensics::{detect_type, entropy};
