//! # 块指纹（复制粘贴检测）
//!
//! ## 设计思路
//!
//! 把图像切成不重叠的 8×8 块，每个像素取灰度高 4 位作为一个十六进制字符，
//! 64 个字符拼成块的模式键。低 4 位的差异被有意忽略，以容忍轻微噪声与重压缩。
//! 同一模式键在图像中出现多次即为复制粘贴的信号。
//!
//! 报告的是“重复的模式及其次数”，并不是区域坐标。
//!
//! ## 实现思路
//!
//! 1. 按行优先列出全部完整块的左上角坐标（不足 8 像素的尾行/尾列丢弃）
//! 2. rayon 并行计算模式键，`collect` 保持行优先顺序
//! 3. `IndexMap` 顺序计数，保证首次出现顺序
//! 4. 稳定排序（次数降序），同次数按首次出现先后

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use super::pixels::PixelBuffer;

pub const BLOCK_SIZE: u32 = 8;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// 一个重复出现的块模式。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRepeat {
    pub pattern: String,
    pub count: usize,
}

/// 块模式统计报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPatternReport {
    pub total_unique_patterns: usize,
    pub total_blocks: usize,
    pub repeated_patterns_found: bool,
    pub top_repeated_patterns: usize,
    /// 次数降序的重复模式（截断），不是坐标框。
    pub potential_copy_paste_regions: Vec<PatternRepeat>,
}

impl BlockPatternReport {
    pub fn unique_count(&self) -> usize {
        self.total_unique_patterns
    }
}

/// 单个块的模式键（64 个十六进制字符）。
pub fn block_key(pixels: &PixelBuffer, start_x: u32, start_y: u32) -> String {
    let mut key = String::with_capacity((BLOCK_SIZE * BLOCK_SIZE) as usize);
    for y in start_y..start_y + BLOCK_SIZE {
        for x in start_x..start_x + BLOCK_SIZE {
            let nibble = (pixels.gray(x, y) & 0xF0) >> 4;
            key.push(HEX_DIGITS[nibble as usize] as char);
        }
    }
    key
}

/// 所有完整块的模式键，行优先顺序。
pub fn block_keys(pixels: &PixelBuffer) -> Vec<String> {
    let blocks_x = pixels.width() / BLOCK_SIZE;
    let blocks_y = pixels.height() / BLOCK_SIZE;

    let origins: Vec<(u32, u32)> = (0..blocks_y)
        .flat_map(|by| (0..blocks_x).map(move |bx| (bx * BLOCK_SIZE, by * BLOCK_SIZE)))
        .collect();

    origins
        .par_iter()
        .map(|&(x, y)| block_key(pixels, x, y))
        .collect()
}

/// 统计块模式并给出排名前 `max_repeats` 的重复模式。
pub fn fingerprint_blocks(pixels: &PixelBuffer, max_repeats: usize) -> BlockPatternReport {
    let keys = block_keys(pixels);
    let total_blocks = keys.len();

    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }

    let total_unique_patterns = counts.len();
    let mut repeats: Vec<PatternRepeat> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(pattern, count)| PatternRepeat { pattern, count })
        .collect();
    repeats.sort_by(|a, b| b.count.cmp(&a.count));
    repeats.truncate(max_repeats);

    BlockPatternReport {
        total_unique_patterns,
        total_blocks,
        repeated_patterns_found: !repeats.is_empty(),
        top_repeated_patterns: repeats.len(),
        potential_copy_paste_regions: repeats,
    }
}
