//! # 图片取证模块（image_forensics）
//!
//! ## 设计思路
//!
//! 把“字节 ↔ 像素”的编解码与“像素 → 证据”的分析算子分开：
//!
//! - `pixels`：RGB 像素缓冲
//! - `codec`：编解码与重采样协作方（默认 `image` + `fast_image_resize`）
//! - `filters`：噪声残差、反色、均衡化、单通道
//! - `fingerprint`：8×8 块模式统计（复制粘贴信号）
//! - `ela`：误差水平分析
//! - `compression`：块 DCT 幅度直方图与压缩周期估计
//! - `metadata`：EXIF 标签、JPEG 帧头结构与缩略图
//! - `handler`：在 `ForensicsEngine` 上做字节级编排
//!
//! ## 实现思路
//!
//! 算子只读输入、总是返回新缓冲；块级计算用 rayon 并行，
//! 但结果顺序与串行实现一致。

pub mod codec;
pub mod compression;
pub mod ela;
pub mod filters;
pub mod fingerprint;
mod handler;
pub mod metadata;
pub mod pixels;

pub use codec::{DecodeLimits, ImageCodec, RasterCodec};
pub use compression::{
    estimate_compression_history, CompressionAnalysis, CompressionReport, CompressionSettings,
    CompressionSignature,
};
pub use ela::{perform_ela, ElaResult};
pub use filters::{apply_color_transform, apply_noise_filter, ColorFilter};
pub use fingerprint::{fingerprint_blocks, BlockPatternReport, PatternRepeat};
pub use metadata::{
    analyze_jpeg_structure, analyze_thumbnail, extract_metadata, GeneratedThumbnail, GpsCoordinates,
    ImageMetadata, JpegComponent, JpegFrame, JpegStructureReport, ThumbnailReport, ThumbnailSettings,
};
pub use pixels::PixelBuffer;
