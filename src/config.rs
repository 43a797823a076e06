//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ForensicsConfig`：输入体积上限、熵窗口、ELA 默认质量、
//! 压缩历史阈值、峰值比例等。阈值属于经验常数而非物理规律，因此必须可配置。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的默认值。
//! - 配置在进程启动时加载一次，之后以 `Arc<ForensicsConfig>` 只读共享，运行期不可修改。
//! - `load_from_path` 读取 JSON，文件不存在时回退默认值；缺失字段由 `#[serde(default)]` 补齐。
//! - `validate` 在加载后统一做范围校验，尽早失败。

use std::fs;
use std::path::Path;

use fast_image_resize as fr;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::ForensicError;

/// 重采样滤镜（可序列化版本，映射到 `image` 与 `fast_image_resize` 的滤镜）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResampleFilter {
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }

    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Nearest => fr::FilterType::Box,
            Self::Triangle => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Gaussian => fr::FilterType::Mitchell,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

/// 压缩周期估计阈值。
///
/// `zero_ratio` 严格大于某个阈值即命中对应周期数，从高到低依次判断。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionThresholds {
    pub three_cycles: f64,
    pub two_cycles: f64,
    pub one_cycle: f64,
}

impl Default for CompressionThresholds {
    fn default() -> Self {
        Self {
            three_cycles: 0.8,
            two_cycles: 0.6,
            one_cycle: 0.4,
        }
    }
}

/// 取证引擎配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForensicsConfig {
    /// 单个输入允许的最大字节数。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 熵计算只看文件前 N 个字节。
    pub entropy_window: usize,
    /// 调用方未指定时使用的 ELA 重编码质量。
    pub default_ela_quality: f32,
    /// 压缩历史分析前的缩放上限（宽高均不超过该值）。
    pub compression_max_dimension: u32,
    /// 压缩历史分析的缩放滤镜（偏质量）。
    pub compression_resize_filter: ResampleFilter,
    pub compression_thresholds: CompressionThresholds,
    /// 直方图局部峰值需超过总量的该比例才计入“压缩签名”。
    pub signature_peak_ratio: f64,
    /// 重复块模式最多报告多少条。
    pub max_repeated_patterns: usize,
    /// 字符串提取的默认最短长度。
    pub min_string_length: usize,
    /// 字符串提取的条数上限。
    pub max_extracted_strings: usize,
    /// 十六进制搜索命中时，前后各附带多少字节上下文。
    pub search_context_bytes: usize,
    /// 生成缩略图的长边上限（不放大）。
    pub thumbnail_max_dimension: u32,
    /// 缩略图 JPEG 质量，`(0, 1]`。
    pub thumbnail_quality: f32,
    pub thumbnail_resize_filter: ResampleFilter,
}

impl Default for ForensicsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            entropy_window: 10 * 1024,
            default_ela_quality: 0.95,
            compression_max_dimension: 512,
            compression_resize_filter: ResampleFilter::CatmullRom,
            compression_thresholds: CompressionThresholds::default(),
            signature_peak_ratio: 0.05,
            max_repeated_patterns: 10,
            min_string_length: 4,
            max_extracted_strings: 1000,
            search_context_bytes: 8,
            thumbnail_max_dimension: 160,
            thumbnail_quality: 0.75,
            thumbnail_resize_filter: ResampleFilter::Triangle,
        }
    }
}

impl ForensicsConfig {
    /// 从 JSON 文件加载配置。
    ///
    /// 文件不存在时返回默认配置；存在但无法解析时报错，不静默回退。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use forensic_lens::config::ForensicsConfig;
    ///
    /// let config = ForensicsConfig::load_from_path("forensics.json")?;
    /// # Ok::<(), forensic_lens::error::ForensicError>(())
    /// ```
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ForensicError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("配置文件不存在，使用默认配置: {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ForensicError::Config(format!("解析配置文件失败: {}", e)))?;
        config.validate()?;

        log::debug!("已加载配置: {}", path.display());
        Ok(config)
    }

    /// 校验各项参数是否处于合理范围。
    pub fn validate(&self) -> Result<(), ForensicError> {
        if self.max_file_size == 0 || self.max_decoded_pixels == 0 || self.max_decoded_bytes == 0 {
            return Err(ForensicError::InvalidParameter("体积与像素上限必须大于 0".to_string()));
        }
        if self.entropy_window == 0 {
            return Err(ForensicError::InvalidParameter("entropy_window 必须大于 0".to_string()));
        }
        validate_quality(self.default_ela_quality)?;
        if self.compression_max_dimension < 8 {
            return Err(ForensicError::InvalidParameter(
                "compression_max_dimension 不能小于 8".to_string(),
            ));
        }

        let t = &self.compression_thresholds;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(t.three_cycles) && in_unit(t.two_cycles) && in_unit(t.one_cycle)) {
            return Err(ForensicError::InvalidParameter("压缩阈值必须在 0~1 之间".to_string()));
        }
        if !(t.three_cycles >= t.two_cycles && t.two_cycles >= t.one_cycle) {
            return Err(ForensicError::InvalidParameter(
                "压缩阈值必须满足 three_cycles >= two_cycles >= one_cycle".to_string(),
            ));
        }

        if !(self.signature_peak_ratio > 0.0 && self.signature_peak_ratio < 1.0) {
            return Err(ForensicError::InvalidParameter(
                "signature_peak_ratio 必须在 (0, 1) 之间".to_string(),
            ));
        }
        if self.max_repeated_patterns == 0 || self.max_extracted_strings == 0 {
            return Err(ForensicError::InvalidParameter("结果条数上限必须大于 0".to_string()));
        }
        if self.min_string_length == 0 {
            return Err(ForensicError::InvalidParameter("min_string_length 必须大于 0".to_string()));
        }
        if self.thumbnail_max_dimension == 0 {
            return Err(ForensicError::InvalidParameter(
                "thumbnail_max_dimension 必须大于 0".to_string(),
            ));
        }
        validate_quality(self.thumbnail_quality)?;

        Ok(())
    }
}

/// 校验 JPEG 质量参数位于 `(0, 1]`。
pub(crate) fn validate_quality(quality: f32) -> Result<(), ForensicError> {
    if quality.is_finite() && quality > 0.0 && quality <= 1.0 {
        Ok(())
    } else {
        Err(ForensicError::InvalidParameter(format!(
            "质量参数必须在 (0, 1] 之间，实际为 {}",
            quality
        )))
    }
}
