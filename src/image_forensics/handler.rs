//! # 图片取证编排
//!
//! ## 设计思路
//!
//! 纯像素算子（`filters` / `fingerprint` / `compression`）不关心字节与格式；
//! 这里负责把“输入字节”接到算子上：体积校验 → 解码 → 分析 → 编码。
//!
//! ## 实现思路
//!
//! - 每次调用读取同一份只读配置，派生解码上限与分析参数。
//! - 记录 `decode/analyze/encode/total` 阶段耗时，便于性能诊断。
//! - 解码得到的缓冲只在本次调用内存活，出错分支同样随作用域释放。

use std::time::Instant;

use super::codec::DecodeLimits;
use super::compression::{estimate_compression_history, CompressionReport, CompressionSettings};
use super::ela::{perform_ela, ElaResult};
use super::filters::{apply_noise_filter, ColorFilter};
use super::fingerprint::{fingerprint_blocks, BlockPatternReport};
use super::metadata::{
    analyze_jpeg_structure, analyze_thumbnail, extract_metadata, ImageMetadata, JpegStructureReport,
    ThumbnailReport, ThumbnailSettings,
};
use super::pixels::PixelBuffer;
use crate::engine::ForensicsEngine;
use crate::error::ForensicError;

impl ForensicsEngine {
    fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits::from(self.config.as_ref())
    }

    /// 校验体积后解码为 RGB 像素。
    pub fn decode_image(&self, bytes: &[u8]) -> Result<PixelBuffer, ForensicError> {
        self.ensure_input_size(bytes)?;
        self.codec.decode(bytes, &self.decode_limits())
    }

    /// 噪声残差图，PNG 编码输出。
    pub fn apply_noise_filter(&self, bytes: &[u8]) -> Result<Vec<u8>, ForensicError> {
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let pixels = self.decode_image(bytes)?;
        let decode_elapsed = decode_start.elapsed();

        let analyze_start = Instant::now();
        let filtered = apply_noise_filter(&pixels);
        let analyze_elapsed = analyze_start.elapsed();

        let encode_start = Instant::now();
        let png = self.codec.encode_png(&filtered)?;
        let encode_elapsed = encode_start.elapsed();

        log::info!(
            "✅ 噪声分析完成 - {}x{} decode={}ms analyze={}ms encode={}ms total={}ms",
            pixels.width(),
            pixels.height(),
            decode_elapsed.as_millis(),
            analyze_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(png)
    }

    /// 按名称应用颜色滤镜，PNG 编码输出。未知名称在解码前即失败。
    pub fn apply_color_filter(&self, bytes: &[u8], filter_name: &str) -> Result<Vec<u8>, ForensicError> {
        let filter: ColorFilter = filter_name.parse()?;
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let pixels = self.decode_image(bytes)?;
        let decode_elapsed = decode_start.elapsed();

        let analyze_start = Instant::now();
        let filtered = filter.apply(&pixels);
        let analyze_elapsed = analyze_start.elapsed();

        let encode_start = Instant::now();
        let png = self.codec.encode_png(&filtered)?;
        let encode_elapsed = encode_start.elapsed();

        log::info!(
            "✅ 颜色滤镜完成 - filter={} decode={}ms analyze={}ms encode={}ms total={}ms",
            filter,
            decode_elapsed.as_millis(),
            analyze_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(png)
    }

    /// 块模式统计（复制粘贴检测）。
    pub fn detect_patterns(&self, bytes: &[u8]) -> Result<BlockPatternReport, ForensicError> {
        let total_start = Instant::now();

        let decode_start = Instant::now();
        let pixels = self.decode_image(bytes)?;
        let decode_elapsed = decode_start.elapsed();

        let analyze_start = Instant::now();
        let report = fingerprint_blocks(&pixels, self.config.max_repeated_patterns);
        let analyze_elapsed = analyze_start.elapsed();

        log::info!(
            "✅ 块模式分析完成 - blocks={} unique={} repeats={} decode={}ms analyze={}ms total={}ms",
            report.total_blocks,
            report.total_unique_patterns,
            report.top_repeated_patterns,
            decode_elapsed.as_millis(),
            analyze_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(report)
    }

    /// 误差水平分析；`quality` 为空时使用配置默认值。
    pub fn perform_ela(&self, bytes: &[u8], quality: Option<f32>) -> Result<ElaResult, ForensicError> {
        self.ensure_input_size(bytes)?;
        let quality = quality.unwrap_or(self.config.default_ela_quality);
        let total_start = Instant::now();

        let result = perform_ela(
            self.codec.as_ref(),
            self.hasher.as_ref(),
            bytes,
            quality,
            &self.decode_limits(),
        )?;

        log::info!(
            "✅ ELA 完成 - quality={} diff={}KB total={}ms",
            quality,
            result.difference_image.len() / 1024,
            total_start.elapsed().as_millis()
        );

        Ok(result)
    }

    /// 压缩历史估计；非 JPEG 返回说明性结果。
    pub fn analyze_compression_history(&self, bytes: &[u8]) -> Result<CompressionReport, ForensicError> {
        self.ensure_input_size(bytes)?;
        let total_start = Instant::now();

        let settings = CompressionSettings::from(self.config.as_ref());
        let report =
            estimate_compression_history(self.codec.as_ref(), bytes, &settings, &self.decode_limits())?;

        match &report {
            CompressionReport::Analyzed(analysis) => log::info!(
                "✅ 压缩历史分析完成 - cycles={} zero_ratio={:.3} total={}ms",
                analysis.estimated_compression_cycles,
                analysis.zero_ratio,
                total_start.elapsed().as_millis()
            ),
            CompressionReport::NotApplicable { message } => {
                log::info!("ℹ️ 压缩历史分析跳过 - {}", message)
            }
        }

        Ok(report)
    }

    /// EXIF 全部标签、GPS 坐标与原始拍摄时间。
    pub fn extract_metadata(&self, bytes: &[u8], filename: &str) -> Result<ImageMetadata, ForensicError> {
        self.ensure_input_size(bytes)?;
        let total_start = Instant::now();

        let metadata = extract_metadata(self.codec.as_ref(), bytes, filename)?;

        log::info!(
            "✅ 元数据提取完成 - tags={} gps={} total={}ms",
            metadata.all_tags.len(),
            metadata.gps_coordinates.is_some(),
            total_start.elapsed().as_millis()
        );

        Ok(metadata)
    }

    /// JPEG 帧头结构与文件哈希。
    pub fn analyze_jpeg_structure(&self, bytes: &[u8]) -> Result<JpegStructureReport, ForensicError> {
        self.ensure_input_size(bytes)?;

        let report = analyze_jpeg_structure(self.hasher.as_ref(), bytes)?;
        match &report.frame {
            Some(frame) => log::info!(
                "✅ JPEG 结构分析完成 - {} {}x{} components={}",
                frame.compression_type,
                frame.image_width,
                frame.image_height,
                frame.number_of_components
            ),
            None => log::info!("ℹ️ 未找到 JPEG 帧头，仅返回文件哈希"),
        }

        Ok(report)
    }

    /// 嵌入缩略图检查与对照缩略图生成。
    pub fn analyze_thumbnail(&self, bytes: &[u8]) -> Result<ThumbnailReport, ForensicError> {
        self.ensure_input_size(bytes)?;
        let total_start = Instant::now();

        let settings = ThumbnailSettings::from(self.config.as_ref());
        let report = analyze_thumbnail(
            self.codec.as_ref(),
            self.hasher.as_ref(),
            bytes,
            &settings,
            &self.decode_limits(),
        )?;

        log::info!(
            "✅ 缩略图分析完成 - embedded={} generated={} total={}ms",
            report.has_thumbnail,
            report.generated_thumbnail.is_some(),
            total_start.elapsed().as_millis()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForensicsConfig;
    use crate::image_forensics::codec::{ImageCodec, RasterCodec};

    fn engine() -> ForensicsEngine {
        ForensicsEngine::new(ForensicsConfig::default()).expect("engine init failed")
    }

    fn sample_png() -> Vec<u8> {
        let img = PixelBuffer::from_fn(24, 16, |x, y| [(x * 10) as u8, (y * 15) as u8, 128]);
        RasterCodec.encode_png(&img).expect("encode failed")
    }

    #[test]
    fn noise_filter_returns_png_with_same_dimensions() {
        let engine = engine();
        let png = engine.apply_noise_filter(&sample_png()).expect("noise filter failed");

        let decoded = engine.decode_image(&png).expect("decode failed");
        assert_eq!(decoded.dimensions(), (24, 16));
    }

    #[test]
    fn color_filter_rejects_unknown_name_before_decoding() {
        let result = engine().apply_color_filter(b"not even an image", "sepia");

        assert!(matches!(result, Err(ForensicError::UnsupportedFilter(_))));
    }

    #[test]
    fn green_filter_keeps_only_green() {
        let engine = engine();
        let png = engine.apply_color_filter(&sample_png(), "GREEN").expect("filter failed");
        let decoded = engine.decode_image(&png).expect("decode failed");

        assert!(decoded.pixels().all(|p| p[0] == 0 && p[2] == 0));
        assert_eq!(decoded.pixel(1, 2)[1], 30);
    }

    #[test]
    fn detect_patterns_respects_configured_limit() {
        let mut config = ForensicsConfig::default();
        config.max_repeated_patterns = 1;
        let engine = ForensicsEngine::new(config).expect("engine init failed");

        let img = PixelBuffer::from_fn(32, 8, |x, _| if x < 16 { [0, 0, 0] } else { [255, 255, 255] });
        let png = RasterCodec.encode_png(&img).expect("encode failed");
        let report = engine.detect_patterns(&png).expect("detect failed");

        assert_eq!(report.total_unique_patterns, 2);
        assert_eq!(report.potential_copy_paste_regions.len(), 1);
    }

    #[test]
    fn ela_uses_default_quality() {
        let img = PixelBuffer::from_fn(16, 16, |x, y| [(x * 16) as u8, (y * 16) as u8, 0]);
        let jpeg = RasterCodec.encode_jpeg(&img, 80).expect("encode failed");
        let result = engine().perform_ela(&jpeg, None).expect("ela failed");

        assert_eq!(result.quality, 0.95);
    }

    #[test]
    fn png_without_exif_has_no_thumbnail() {
        let report = engine().analyze_thumbnail(&sample_png()).expect("thumbnail failed");

        assert!(!report.has_thumbnail);
        assert!(report.generated_thumbnail.is_none());
    }

    #[test]
    fn thumbnail_settings_follow_config() {
        let mut config = ForensicsConfig::default();
        config.thumbnail_max_dimension = 12;
        let engine = ForensicsEngine::new(config).expect("engine init failed");

        let settings = ThumbnailSettings::from(engine.config());
        let thumb = crate::image_forensics::metadata::generate_thumbnail(
            &RasterCodec,
            engine.hasher.as_ref(),
            &PixelBuffer::filled(24, 16, [9, 9, 9]),
            &settings,
        )
        .expect("thumbnail failed");

        assert_eq!((thumb.width, thumb.height), (12, 8));
    }

    #[test]
    fn jpeg_structure_on_png_only_hashes() {
        let report = engine().analyze_jpeg_structure(&sample_png()).expect("analysis failed");

        assert!(report.frame.is_none());
        assert_eq!(report.file_hash.len(), 64);
    }

    #[test]
    fn oversized_input_is_rejected() {
        let mut config = ForensicsConfig::default();
        config.max_file_size = 16;
        let engine = ForensicsEngine::new(config).expect("engine init failed");

        assert!(matches!(
            engine.detect_patterns(&sample_png()),
            Err(ForensicError::ResourceLimit(_))
        ));
    }
}
