//! # 编解码与重采样模块
//!
//! ## 设计思路
//!
//! 图片编解码属于外部协作方，核心通过 `ImageCodec` trait 使用它。
//! 默认实现 `RasterCodec` 负责“字节 → RGB”解码、PNG 无损编码、可控质量 JPEG 编码与重采样，
//! 并在关键节点增加资源上限控制：先读 header 尺寸做像素/内存检查，再完整解码，
//! 降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限与预计内存快速拒绝
//! 3. 完整解码并转换为 RGB
//! 4. 重采样优先 `fast_image_resize`，失败时回退 `image::imageops::resize`

use std::io::Cursor;

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageFormat, ImageReader, RgbImage};

use super::pixels::PixelBuffer;
use crate::config::{ForensicsConfig, ResampleFilter};
use crate::error::ForensicError;

/// 解码阶段的资源上限。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_decoded_pixels: u64,
    pub max_decoded_bytes: u64,
}

impl From<&ForensicsConfig> for DecodeLimits {
    fn from(config: &ForensicsConfig) -> Self {
        Self {
            max_decoded_pixels: config.max_decoded_pixels,
            max_decoded_bytes: config.max_decoded_bytes,
        }
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from(&ForensicsConfig::default())
    }
}

/// 图片编解码与重采样能力（外部协作方）。
pub trait ImageCodec: Send + Sync {
    /// 仅根据字节头猜测格式，不解码。
    fn sniff_format(&self, bytes: &[u8]) -> Option<ImageFormat>;

    fn decode(&self, bytes: &[u8], limits: &DecodeLimits) -> Result<PixelBuffer, ForensicError>;

    /// 无损 PNG 编码。
    fn encode_png(&self, pixels: &PixelBuffer) -> Result<Vec<u8>, ForensicError>;

    /// 有损 JPEG 编码，`quality` 取值 1~100。
    fn encode_jpeg(&self, pixels: &PixelBuffer, quality: u8) -> Result<Vec<u8>, ForensicError>;

    /// 缩放到指定尺寸。
    fn resize_exact(
        &self,
        pixels: &PixelBuffer,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<PixelBuffer, ForensicError>;
}

/// 基于 `image` + `fast_image_resize` 的默认实现。
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn sniff_format(&self, bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    fn decode(&self, bytes: &[u8], limits: &DecodeLimits) -> Result<PixelBuffer, ForensicError> {
        let format = image::guess_format(bytes)
            .map_err(|e| ForensicError::Decode(format!("无法识别图片格式：{}", e)))?;

        let (header_width, header_height) = inspect_dimensions_from_memory(bytes)?;
        validate_pixel_limits(limits, header_width, header_height)?;
        validate_decoded_memory_limits(limits, header_width, header_height)?;

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ForensicError::Decode(format!("图片解码失败：{}", e)))?;

        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        validate_pixel_limits(limits, width, height)?;

        log::debug!("图片解码成功 - 格式: {:?} 尺寸: {}x{}", format, width, height);
        Ok(PixelBuffer::from(rgb))
    }

    fn encode_png(&self, pixels: &PixelBuffer) -> Result<Vec<u8>, ForensicError> {
        let rgb = pixels.to_rgb_image()?;
        let mut out = Vec::new();
        rgb.write_with_encoder(PngEncoder::new(&mut out))
            .map_err(|e| ForensicError::Encode(format!("PNG 编码失败：{}", e)))?;
        Ok(out)
    }

    fn encode_jpeg(&self, pixels: &PixelBuffer, quality: u8) -> Result<Vec<u8>, ForensicError> {
        if !(1..=100).contains(&quality) {
            return Err(ForensicError::InvalidParameter(format!(
                "JPEG 质量必须在 1~100 之间，实际为 {}",
                quality
            )));
        }

        let rgb = pixels.to_rgb_image()?;
        let mut out = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
            .map_err(|e| ForensicError::Encode(format!("JPEG 编码失败：{}", e)))?;
        Ok(out)
    }

    fn resize_exact(
        &self,
        pixels: &PixelBuffer,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<PixelBuffer, ForensicError> {
        if width == 0 || height == 0 || pixels.is_empty() {
            return Err(ForensicError::InvalidParameter(format!(
                "缩放尺寸无效：{}x{} -> {}x{}",
                pixels.width(),
                pixels.height(),
                width,
                height
            )));
        }
        if pixels.dimensions() == (width, height) {
            return Ok(pixels.clone());
        }

        match resize_with_fast_image_resize(pixels, width, height, filter) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}",
                    err
                );
                let rgb = pixels.to_rgb_image()?;
                let resized =
                    image::imageops::resize(&rgb, width, height, filter.to_image_filter());
                Ok(PixelBuffer::from(resized))
            }
        }
    }
}

/// 仅通过内存中的图片头信息读取宽高。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ForensicError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ForensicError::Decode(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| ForensicError::Decode(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(limits: &DecodeLimits, width: u32, height: u32) -> Result<(), ForensicError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ForensicError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > limits.max_decoded_pixels {
        return Err(ForensicError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, limits.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(
    limits: &DecodeLimits,
    width: u32,
    height: u32,
) -> Result<(), ForensicError> {
    let estimated = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| ForensicError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > limits.max_decoded_bytes {
        return Err(ForensicError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            limits.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

fn resize_with_fast_image_resize(
    pixels: &PixelBuffer,
    target_width: u32,
    target_height: u32,
    filter: ResampleFilter,
) -> Result<PixelBuffer, ForensicError> {
    let src_image = fr::images::Image::from_vec_u8(
        pixels.width(),
        pixels.height(),
        pixels.as_raw().to_vec(),
        fr::PixelType::U8x3,
    )
    .map_err(|e| ForensicError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(filter.to_fast_filter()));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ForensicError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgb = RgbImage::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ForensicError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(PixelBuffer::from(rgb))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, y| {
            [(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8]
        })
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let img = gradient(37, 21);
        let png = RasterCodec.encode_png(&img).expect("encode failed");

        assert_eq!(RasterCodec.sniff_format(&png), Some(ImageFormat::Png));
        let decoded = RasterCodec
            .decode(&png, &DecodeLimits::default())
            .expect("decode failed");
        assert_eq!(decoded, img);
    }

    #[test]
    fn jpeg_encoding_keeps_dimensions() {
        let img = gradient(40, 24);
        let jpeg = RasterCodec.encode_jpeg(&img, 90).expect("encode failed");

        assert_eq!(RasterCodec.sniff_format(&jpeg), Some(ImageFormat::Jpeg));
        let decoded = RasterCodec
            .decode(&jpeg, &DecodeLimits::default())
            .expect("decode failed");
        assert_eq!(decoded.dimensions(), (40, 24));
    }

    #[test]
    fn jpeg_quality_out_of_range_is_rejected() {
        let img = gradient(8, 8);

        assert!(matches!(
            RasterCodec.encode_jpeg(&img, 0),
            Err(ForensicError::InvalidParameter(_))
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = RasterCodec.decode(b"definitely not an image", &DecodeLimits::default());

        assert!(matches!(result, Err(ForensicError::Decode(_))));
    }

    #[test]
    fn decode_rejects_too_many_pixels() {
        let png = RasterCodec.encode_png(&gradient(64, 64)).expect("encode failed");
        let limits = DecodeLimits {
            max_decoded_pixels: 1000,
            max_decoded_bytes: u64::MAX,
        };

        assert!(matches!(
            RasterCodec.decode(&png, &limits),
            Err(ForensicError::ResourceLimit(_))
        ));
    }

    #[test]
    fn resize_produces_requested_dimensions() {
        let img = gradient(100, 50);
        let resized = RasterCodec
            .resize_exact(&img, 40, 20, ResampleFilter::CatmullRom)
            .expect("resize failed");

        assert_eq!(resized.dimensions(), (40, 20));
        assert_eq!(resized.as_raw().len(), 40 * 20 * 3);
    }
}
