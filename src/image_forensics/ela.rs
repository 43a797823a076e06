//! # 误差水平分析（ELA）
//!
//! ## 设计思路
//!
//! 以指定质量把 JPEG 重新压缩一次，再与原图逐像素做差。
//! 经过二次编辑的区域与其余部分的“压缩误差水平”不同，放大后肉眼可见。
//!
//! ## 实现思路
//!
//! 1. 校验质量参数与输入格式（仅 JPEG）
//! 2. 解码原图 → 重编码 → 解码重编码结果
//! 3. 逐通道 `min(255, |a - b| * 10)` 得到差异图，PNG 无损编码
//! 4. 对原始字节与重编码字节分别计算 SHA-256，便于审计复现
//!
//! 中间缓冲均为局部所有权，任意分支返回时都会被释放。

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::{Serialize, Serializer};

use super::codec::{DecodeLimits, ImageCodec};
use super::pixels::PixelBuffer;
use crate::config::validate_quality;
use crate::error::ForensicError;
use crate::hashing::{ContentHasher, DEFAULT_ALGORITHM};

/// 差异放大倍数。
pub const ELA_AMPLIFICATION: u16 = 10;

/// ELA 结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElaResult {
    /// PNG 编码的差异图（JSON 中为 base64）。
    #[serde(serialize_with = "serialize_base64")]
    pub difference_image: Vec<u8>,
    pub quality: f32,
    pub original_hash: String,
    pub resaved_hash: String,
}

pub(crate) fn serialize_base64<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
}

/// `(0, 1]` 的质量映射到编码器的 `1..=100`。
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// 逐通道放大差异：`min(255, |a - b| * 10)`。
pub fn difference_image(
    original: &PixelBuffer,
    resaved: &PixelBuffer,
) -> Result<PixelBuffer, ForensicError> {
    if original.dimensions() != resaved.dimensions() {
        return Err(ForensicError::Decode(format!(
            "重编码后尺寸不一致：{:?} vs {:?}",
            original.dimensions(),
            resaved.dimensions()
        )));
    }

    let data = original
        .as_raw()
        .iter()
        .zip(resaved.as_raw())
        .map(|(a, b)| (a.abs_diff(*b) as u16 * ELA_AMPLIFICATION).min(255) as u8)
        .collect();

    PixelBuffer::new(original.width(), original.height(), data)
}

/// 对 JPEG 字节执行 ELA。
pub fn perform_ela(
    codec: &dyn ImageCodec,
    hasher: &dyn ContentHasher,
    bytes: &[u8],
    quality: f32,
    limits: &DecodeLimits,
) -> Result<ElaResult, ForensicError> {
    validate_quality(quality)?;

    match codec.sniff_format(bytes) {
        Some(ImageFormat::Jpeg) => {}
        Some(other) => {
            return Err(ForensicError::UnsupportedFormat(format!(
                "ELA 仅支持 JPEG，输入为 {:?}",
                other
            )));
        }
        None => {
            return Err(ForensicError::UnsupportedFormat(
                "ELA 仅支持 JPEG，无法识别输入格式".to_string(),
            ));
        }
    }

    let original = codec.decode(bytes, limits)?;
    let resaved_bytes = codec.encode_jpeg(&original, jpeg_quality(quality))?;
    let resaved = codec.decode(&resaved_bytes, limits)?;

    let diff = difference_image(&original, &resaved)?;
    let difference_image = codec.encode_png(&diff)?;

    Ok(ElaResult {
        difference_image,
        quality,
        original_hash: hasher.hash_hex(bytes, DEFAULT_ALGORITHM)?,
        resaved_hash: hasher.hash_hex(&resaved_bytes, DEFAULT_ALGORITHM)?,
    })
}
