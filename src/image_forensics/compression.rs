//! # 压缩历史估计
//!
//! ## 设计思路
//!
//! 近似的块 DCT 分析，不读取 JPEG 真实量化系数：
//! 对缩放后的灰度图做 8×8 DCT-II，统计 64 个频率位置的平均幅度，
//! 再把幅度归一化到 100 个桶里。多次有损压缩会把高频能量压向 0，
//! 于是“0 号桶占比”越高，推测经历的压缩次数越多。
//!
//! 另外独立给出“压缩签名”：直方图中超过总量一定比例的局部峰值个数。
//! 两个启发式可能互相矛盾，这本身就是诊断信息，二者并列输出、不做调和。
//!
//! ## 实现思路
//!
//! 1. 非 JPEG 输入返回说明性结果，不报错
//! 2. 解码后缩放到不超过 `compression_max_dimension`（保持宽高比）
//! 3. rayon 并行计算各窗口 DCT 幅度，按行优先顺序串行累加
//! 4. 归一化 → 100 桶直方图 → 周期数 + 签名

use std::fmt;

use image::ImageFormat;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::{Serialize, Serializer};

use super::codec::{DecodeLimits, ImageCodec};
use super::pixels::PixelBuffer;
use crate::config::{CompressionThresholds, ForensicsConfig, ResampleFilter};
use crate::error::ForensicError;

pub const DCT_SIZE: usize = 8;
pub const COEFFICIENT_COUNT: usize = DCT_SIZE * DCT_SIZE;
pub const HISTOGRAM_BINS: usize = 100;

pub const NOT_JPEG_MESSAGE: &str =
    "Compression history analysis is only available for JPEG images";
pub const TOO_SMALL_MESSAGE: &str =
    "Image is too small for compression history analysis (needs at least one 8x8 block)";

/// `COS_TABLE[i][u] = cos((2i + 1) * u * π / 16)`。
static COS_TABLE: Lazy<[[f64; DCT_SIZE]; DCT_SIZE]> = Lazy::new(|| {
    let mut table = [[0.0; DCT_SIZE]; DCT_SIZE];
    for (i, row) in table.iter_mut().enumerate() {
        for (u, value) in row.iter_mut().enumerate() {
            *value = (((2 * i + 1) * u) as f64 * std::f64::consts::PI / 16.0).cos();
        }
    }
    table
});

/// 压缩历史分析参数（从配置派生）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionSettings {
    pub max_dimension: u32,
    pub resize_filter: ResampleFilter,
    pub thresholds: CompressionThresholds,
    pub peak_ratio: f64,
}

impl From<&ForensicsConfig> for CompressionSettings {
    fn from(config: &ForensicsConfig) -> Self {
        Self {
            max_dimension: config.compression_max_dimension,
            resize_filter: config.compression_resize_filter,
            thresholds: config.compression_thresholds,
            peak_ratio: config.signature_peak_ratio,
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self::from(&ForensicsConfig::default())
    }
}

/// 直方图峰值给出的压缩签名。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionSignature {
    NoDistinctive,
    SingleCycle,
    MultipleCycles { peaks: usize },
}

impl fmt::Display for CompressionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDistinctive => f.write_str("No distinctive compression signature detected"),
            Self::SingleCycle => f.write_str("Single compression cycle detected"),
            Self::MultipleCycles { peaks } => write!(
                f,
                "Multiple compression cycles detected, with {} distinct peaks",
                peaks
            ),
        }
    }
}

impl Serialize for CompressionSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// JPEG 的分析结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionAnalysis {
    pub estimated_compression_cycles: u8,
    pub zero_ratio: f64,
    pub compression_signature: CompressionSignature,
    pub histogram: Vec<u32>,
    /// 原图尺寸。
    pub image_width: u32,
    pub image_height: u32,
    /// 实际参与分析的（缩放后）尺寸。
    pub analyzed_width: u32,
    pub analyzed_height: u32,
    pub blocks_analyzed: usize,
}

/// 压缩历史报告：不适用时只携带说明。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompressionReport {
    NotApplicable {
        #[serde(rename = "compressionAnalysis")]
        message: String,
    },
    Analyzed(CompressionAnalysis),
}

/// 保持宽高比缩放到 `max_dimension` 以内；已满足时原样返回。
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let scale = (max_dimension as f64 / width as f64).min(max_dimension as f64 / height as f64);
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, max_dimension);
    (scaled(width), scaled(height))
}

/// 8×8 DCT-II，输入与输出均按 `v * 8 + u` 行优先排列。
pub fn dct_block(block: &[f64; COEFFICIENT_COUNT]) -> [f64; COEFFICIENT_COUNT] {
    let cos = &*COS_TABLE;
    let alpha = |k: usize| if k == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };

    let mut coefficients = [0.0; COEFFICIENT_COUNT];
    for v in 0..DCT_SIZE {
        for u in 0..DCT_SIZE {
            let mut sum = 0.0;
            for j in 0..DCT_SIZE {
                for i in 0..DCT_SIZE {
                    sum += block[j * DCT_SIZE + i] * cos[i][u] * cos[j][v];
                }
            }
            coefficients[v * DCT_SIZE + u] = 0.25 * alpha(u) * alpha(v) * sum;
        }
    }
    coefficients
}

fn gray_block(pixels: &PixelBuffer, start_x: u32, start_y: u32) -> [f64; COEFFICIENT_COUNT] {
    let mut block = [0.0; COEFFICIENT_COUNT];
    for j in 0..DCT_SIZE {
        for i in 0..DCT_SIZE {
            let [r, g, b] = pixels.pixel(start_x + i as u32, start_y + j as u32);
            block[j * DCT_SIZE + i] = (r as f64 + g as f64 + b as f64) / 3.0;
        }
    }
    block
}

/// 所有完整 8×8 窗口的平均 DCT 幅度；一个窗口都没有时返回 `None`。
pub fn mean_dct_magnitudes(pixels: &PixelBuffer) -> Option<([f64; COEFFICIENT_COUNT], usize)> {
    let step = DCT_SIZE as u32;
    let blocks_x = pixels.width() / step;
    let blocks_y = pixels.height() / step;

    let origins: Vec<(u32, u32)> = (0..blocks_y)
        .flat_map(|by| (0..blocks_x).map(move |bx| (bx * step, by * step)))
        .collect();
    if origins.is_empty() {
        return None;
    }

    let magnitudes: Vec<[f64; COEFFICIENT_COUNT]> = origins
        .par_iter()
        .map(|&(x, y)| dct_block(&gray_block(pixels, x, y)).map(f64::abs))
        .collect();

    let mut sums = [0.0; COEFFICIENT_COUNT];
    for block in &magnitudes {
        for (sum, value) in sums.iter_mut().zip(block) {
            *sum += value;
        }
    }

    let count = magnitudes.len();
    Some((sums.map(|s| s / count as f64), count))
}

/// 按 `floor(|c| / max * 99)` 分桶；最大值为 0 时全部落入 0 号桶。
pub fn coefficient_histogram(magnitudes: &[f64]) -> [u32; HISTOGRAM_BINS] {
    let mut histogram = [0u32; HISTOGRAM_BINS];
    let max = magnitudes.iter().copied().fold(0.0f64, f64::max);

    for value in magnitudes {
        let bin = if max > 0.0 && max.is_finite() {
            ((value.abs() / max) * (HISTOGRAM_BINS - 1) as f64) as usize
        } else {
            0
        };
        histogram[bin.min(HISTOGRAM_BINS - 1)] += 1;
    }
    histogram
}

pub fn zero_ratio(histogram: &[u32]) -> f64 {
    let total: u64 = histogram.iter().map(|&c| c as u64).sum();
    match histogram.first() {
        Some(&zero) if total > 0 => zero as f64 / total as f64,
        _ => 0.0,
    }
}

/// 严格大于阈值才命中，从高到低判断。
pub fn estimate_cycles(zero_ratio: f64, thresholds: &CompressionThresholds) -> u8 {
    if zero_ratio > thresholds.three_cycles {
        3
    } else if zero_ratio > thresholds.two_cycles {
        2
    } else if zero_ratio > thresholds.one_cycle {
        1
    } else {
        0
    }
}

/// 统计内部桶（不含首尾）中严格大于左右邻居且超过总量 `peak_ratio` 的峰。
pub fn compression_signature(histogram: &[u32], peak_ratio: f64) -> CompressionSignature {
    let total: u64 = histogram.iter().map(|&c| c as u64).sum();
    let floor = total as f64 * peak_ratio;

    let peaks = histogram
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2] && w[1] as f64 > floor)
        .count();

    match peaks {
        0 => CompressionSignature::NoDistinctive,
        1 => CompressionSignature::SingleCycle,
        n => CompressionSignature::MultipleCycles { peaks: n },
    }
}

/// 对已解码（且已缩放）的像素做分析。
pub fn analyze_pixels(
    pixels: &PixelBuffer,
    settings: &CompressionSettings,
) -> Option<CompressionAnalysis> {
    let (magnitudes, blocks) = mean_dct_magnitudes(pixels)?;
    let histogram = coefficient_histogram(&magnitudes);
    let ratio = zero_ratio(&histogram);

    Some(CompressionAnalysis {
        estimated_compression_cycles: estimate_cycles(ratio, &settings.thresholds),
        zero_ratio: ratio,
        compression_signature: compression_signature(&histogram, settings.peak_ratio),
        histogram: histogram.to_vec(),
        image_width: pixels.width(),
        image_height: pixels.height(),
        analyzed_width: pixels.width(),
        analyzed_height: pixels.height(),
        blocks_analyzed: blocks,
    })
}

/// 对 JPEG 字节估计压缩历史；非 JPEG 返回说明而不是错误。
pub fn estimate_compression_history(
    codec: &dyn ImageCodec,
    bytes: &[u8],
    settings: &CompressionSettings,
    limits: &DecodeLimits,
) -> Result<CompressionReport, ForensicError> {
    if codec.sniff_format(bytes) != Some(ImageFormat::Jpeg) {
        return Ok(CompressionReport::NotApplicable {
            message: NOT_JPEG_MESSAGE.to_string(),
        });
    }

    let decoded = codec.decode(bytes, limits)?;
    let (width, height) = decoded.dimensions();
    let (target_width, target_height) = scaled_dimensions(width, height, settings.max_dimension);

    let scaled = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        log::debug!(
            "压缩分析缩放 {}x{} -> {}x{}",
            width,
            height,
            target_width,
            target_height
        );
        codec.resize_exact(&decoded, target_width, target_height, settings.resize_filter)?
    };

    match analyze_pixels(&scaled, settings) {
        Some(mut analysis) => {
            analysis.image_width = width;
            analysis.image_height = height;
            Ok(CompressionReport::Analyzed(analysis))
        }
        None => Ok(CompressionReport::NotApplicable {
            message: TOO_SMALL_MESSAGE.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_forensics::codec::RasterCodec;
    use proptest::prelude::*;

    fn analyze_bytes(bytes: &[u8]) -> CompressionReport {
        estimate_compression_history(
            &RasterCodec,
            bytes,
            &CompressionSettings::default(),
            &DecodeLimits::default(),
        )
        .expect("analysis failed")
    }

    #[test]
    fn scaled_dimensions_preserve_aspect() {
        assert_eq!(scaled_dimensions(100, 50, 512), (100, 50));
        assert_eq!(scaled_dimensions(2000, 1000, 512), (512, 256));
        assert_eq!(scaled_dimensions(300, 1200, 512), (128, 512));
        assert_eq!(scaled_dimensions(5000, 3, 512), (512, 1));
    }

    #[test]
    fn constant_block_has_only_dc_energy() {
        let coefficients = dct_block(&[100.0; COEFFICIENT_COUNT]);

        assert!((coefficients[0] - 800.0).abs() < 1e-9);
        assert!(coefficients[1..].iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn horizontal_cosine_lands_on_u_axis() {
        let mut block = [0.0; COEFFICIENT_COUNT];
        for j in 0..DCT_SIZE {
            for i in 0..DCT_SIZE {
                block[j * DCT_SIZE + i] = COS_TABLE[i][1];
            }
        }
        let coefficients = dct_block(&block);

        // u = 1, v = 0
        let peak = coefficients[1].abs();
        assert!(peak > 1.0);
        assert!(coefficients[DCT_SIZE].abs() < 1e-9);
    }

    #[test]
    fn zero_max_goes_to_first_bin() {
        let histogram = coefficient_histogram(&[0.0; COEFFICIENT_COUNT]);

        assert_eq!(histogram[0], 64);
        assert_eq!(zero_ratio(&histogram), 1.0);
    }

    #[test]
    fn max_coefficient_lands_in_last_bin() {
        let mut magnitudes = [0.0; COEFFICIENT_COUNT];
        magnitudes[0] = 10.0;
        magnitudes[1] = 5.0;
        let histogram = coefficient_histogram(&magnitudes);

        assert_eq!(histogram[99], 1);
        assert_eq!(histogram[49], 1);
        assert_eq!(histogram[0], 62);
    }

    #[test]
    fn cycles_follow_strict_thresholds() {
        let t = CompressionThresholds::default();

        assert_eq!(estimate_cycles(0.95, &t), 3);
        assert_eq!(estimate_cycles(0.8, &t), 2);
        assert_eq!(estimate_cycles(0.61, &t), 2);
        assert_eq!(estimate_cycles(0.5, &t), 1);
        assert_eq!(estimate_cycles(0.4, &t), 0);
    }

    #[test]
    fn signature_counts_significant_peaks() {
        let mut histogram = [0u32; HISTOGRAM_BINS];
        histogram[0] = 40;
        histogram[10] = 8;
        histogram[50] = 12;
        histogram[70] = 1;
        histogram[99] = 3;

        let signature = compression_signature(&histogram, 0.05);
        assert_eq!(signature, CompressionSignature::MultipleCycles { peaks: 2 });
        assert_eq!(
            signature.to_string(),
            "Multiple compression cycles detected, with 2 distinct peaks"
        );
    }

    #[test]
    fn signature_ignores_edge_bins() {
        let mut histogram = [0u32; HISTOGRAM_BINS];
        histogram[0] = 63;
        histogram[99] = 1;

        assert_eq!(compression_signature(&histogram, 0.05), CompressionSignature::NoDistinctive);
    }

    #[test]
    fn solid_jpeg_estimates_three_cycles() {
        let img = PixelBuffer::filled(64, 64, [120, 120, 120]);
        let jpeg = RasterCodec.encode_jpeg(&img, 90).expect("encode failed");

        match analyze_bytes(&jpeg) {
            CompressionReport::Analyzed(analysis) => {
                assert_eq!(analysis.estimated_compression_cycles, 3);
                assert!(analysis.zero_ratio > 0.95);
                assert_eq!(analysis.histogram.len(), HISTOGRAM_BINS);
                assert_eq!(analysis.blocks_analyzed, 64);
                assert_eq!((analysis.image_width, analysis.image_height), (64, 64));
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn large_jpeg_is_downscaled() {
        let img = PixelBuffer::from_fn(1024, 256, |x, y| [(x % 256) as u8, (y % 256) as u8, 80]);
        let jpeg = RasterCodec.encode_jpeg(&img, 90).expect("encode failed");

        match analyze_bytes(&jpeg) {
            CompressionReport::Analyzed(analysis) => {
                assert_eq!((analysis.image_width, analysis.image_height), (1024, 256));
                assert_eq!((analysis.analyzed_width, analysis.analyzed_height), (512, 128));
                assert_eq!(analysis.blocks_analyzed, 64 * 16);
            }
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn png_is_not_applicable() {
        let png = RasterCodec
            .encode_png(&PixelBuffer::filled(16, 16, [1, 1, 1]))
            .expect("encode failed");

        assert_eq!(
            analyze_bytes(&png),
            CompressionReport::NotApplicable {
                message: NOT_JPEG_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn tiny_jpeg_is_not_applicable() {
        let jpeg = RasterCodec
            .encode_jpeg(&PixelBuffer::filled(5, 5, [9, 9, 9]), 90)
            .expect("encode failed");

        assert!(matches!(analyze_bytes(&jpeg), CompressionReport::NotApplicable { .. }));
    }

    #[test]
    fn not_applicable_serializes_as_message() {
        let report = CompressionReport::NotApplicable {
            message: NOT_JPEG_MESSAGE.to_string(),
        };
        let json = serde_json::to_value(&report).expect("serialize failed");

        assert_eq!(json["compressionAnalysis"], NOT_JPEG_MESSAGE);
    }

    proptest! {
        #[test]
        fn dct_preserves_energy(values in proptest::collection::vec(0.0f64..255.0, COEFFICIENT_COUNT)) {
            let mut block = [0.0; COEFFICIENT_COUNT];
            block.copy_from_slice(&values);
            let coefficients = dct_block(&block);

            let spatial: f64 = block.iter().map(|v| v * v).sum();
            let spectral: f64 = coefficients.iter().map(|c| c * c).sum();
            prop_assert!((spatial - spectral).abs() <= 1e-6 * spatial.max(1.0));
        }
    }
}
