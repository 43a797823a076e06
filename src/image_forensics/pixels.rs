//! # 像素缓冲模型
//!
//! ## 设计思路
//!
//! 将“编解码器产物”与“分析算子输入”解耦：算子只面向 `PixelBuffer`，
//! 不关心原始格式。所有派生图像都是新分配的缓冲，输入永远不被原地修改。
//!
//! 像素以 RGB 交错存储，alpha 在解码时丢弃。

use image::RgbImage;

use crate::error::ForensicError;

/// 解码后的 RGB 像素缓冲。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    /// RGB 字节数组（`width * height * 3`）。
    data: Vec<u8>,
}

impl PixelBuffer {
    /// 用现有 RGB 字节构建缓冲，长度必须与尺寸一致。
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ForensicError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .ok_or_else(|| ForensicError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

        if data.len() != expected {
            return Err(ForensicError::InvalidParameter(format!(
                "像素数据长度异常：期望 {} 字节，实际 {} 字节",
                expected,
                data.len()
            )));
        }

        Ok(Self { width, height, data })
    }

    /// 纯色图像。
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let data = rgb.iter().copied().cycle().take(pixels * 3).collect();
        Self { width, height, data }
    }

    /// 按坐标生成像素。
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    /// 读取像素，坐标越界会 panic（与切片索引语义一致）。
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    /// 灰度值：`(R + G + B) / 3`，整数除法。
    pub fn gray(&self, x: u32, y: u32) -> u8 {
        gray_of(self.pixel(x, y))
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    /// 对每个像素做映射，返回新缓冲。
    pub fn map_pixels<F>(&self, f: F) -> Self
    where
        F: Fn([u8; 3]) -> [u8; 3],
    {
        let mut data = Vec::with_capacity(self.data.len());
        for p in self.pixels() {
            data.extend_from_slice(&f(p));
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn to_rgb_image(&self) -> Result<RgbImage, ForensicError> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| ForensicError::Encode("像素缓冲长度与尺寸不一致".to_string()))
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// 灰度值：`(R + G + B) / 3`，整数除法。
pub fn gray_of(rgb: [u8; 3]) -> u8 {
    ((rgb[0] as u16 + rgb[1] as u16 + rgb[2] as u16) / 3) as u8
}
