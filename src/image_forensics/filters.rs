//! # 像素滤镜
//!
//! ## 设计思路
//!
//! - 噪声残差：固定 3×3 高通核 `[-1,-1,-1; -1,8,-1; -1,-1,-1]`，暴露传感器噪声与拼接边缘。
//!   边缘像素原样保留（不补零、不裁剪）。
//! - 颜色变换：反色、直方图均衡、单通道保留。
//!
//! 均衡化使用“一张共享的灰度直方图”映射全部三个通道，而不是逐通道均衡。
//! 两者视觉效果不同，这里保持共享映射的行为。
//!
//! 所有函数都返回新缓冲，输入只读。

use std::fmt;
use std::str::FromStr;

use super::pixels::{gray_of, PixelBuffer};
use crate::error::ForensicError;

/// 高通卷积核（行优先）。
const NOISE_KERNEL: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 8, -1], [-1, -1, -1]];

/// 颜色滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFilter {
    Invert,
    Equalize,
    Red,
    Green,
    Blue,
}

impl ColorFilter {
    pub const ALL: [ColorFilter; 5] = [
        ColorFilter::Invert,
        ColorFilter::Equalize,
        ColorFilter::Red,
        ColorFilter::Green,
        ColorFilter::Blue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invert => "invert",
            Self::Equalize => "equalize",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    pub fn apply(self, pixels: &PixelBuffer) -> PixelBuffer {
        match self {
            Self::Invert => invert(pixels),
            Self::Equalize => equalize(pixels),
            Self::Red => isolate_channel(pixels, 0),
            Self::Green => isolate_channel(pixels, 1),
            Self::Blue => isolate_channel(pixels, 2),
        }
    }
}

impl FromStr for ColorFilter {
    type Err = ForensicError;

    /// 名称大小写不敏感，未知名称直接报错。
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str() == normalized)
            .ok_or_else(|| ForensicError::UnsupportedFilter(name.to_string()))
    }
}

impl fmt::Display for ColorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 噪声残差滤镜。
pub fn apply_noise_filter(pixels: &PixelBuffer) -> PixelBuffer {
    let (width, height) = pixels.dimensions();
    let mut output = pixels.clone();
    if width < 3 || height < 3 {
        return output;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = [0i32; 3];
            for (ky, row) in NOISE_KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let p = pixels.pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for c in 0..3 {
                        acc[c] += weight * p[c] as i32;
                    }
                }
            }
            output.put_pixel(x, y, acc.map(|v| v.clamp(0, 255) as u8));
        }
    }

    output
}

/// 按名称应用颜色滤镜。
pub fn apply_color_transform(pixels: &PixelBuffer, name: &str) -> Result<PixelBuffer, ForensicError> {
    let filter: ColorFilter = name.parse()?;
    Ok(filter.apply(pixels))
}

pub fn invert(pixels: &PixelBuffer) -> PixelBuffer {
    pixels.map_pixels(|p| p.map(|c| 255 - c))
}

/// 共享灰度直方图均衡。
pub fn equalize(pixels: &PixelBuffer) -> PixelBuffer {
    if pixels.is_empty() {
        return pixels.clone();
    }

    let lut = equalization_table(pixels);
    pixels.map_pixels(|p| p.map(|c| lut[c as usize]))
}

/// 由灰度直方图的累积分布得到 256 项查找表：`round(cdf[v] * 255)`。
pub fn equalization_table(pixels: &PixelBuffer) -> [u8; 256] {
    let mut histogram = [0u64; 256];
    for p in pixels.pixels() {
        histogram[gray_of(p) as usize] += 1;
    }

    let total = histogram.iter().sum::<u64>().max(1) as f64;
    let mut lut = [0u8; 256];
    let mut cdf = 0.0f64;
    for (value, count) in histogram.iter().enumerate() {
        cdf += *count as f64 / total;
        lut[value] = (cdf * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// 只保留第 `channel` 个通道（0=R，1=G，2=B），其余置零。
pub fn isolate_channel(pixels: &PixelBuffer, channel: usize) -> PixelBuffer {
    pixels.map_pixels(|p| {
        let mut out = [0u8; 3];
        if let Some(value) = p.get(channel) {
            out[channel] = *value;
        }
        out
    })
}
