//! 二进制字符串提取与模式搜索
//!
//! - `extract_strings`：类似 `strings(1)`，提取连续的可打印 ASCII（0x20~0x7E）。
//! - `search_hex_pattern`：在整段缓冲区内查找字节序列（允许重叠命中），附带前后上下文。
//! - `search_text_pattern`：按行做大小写不敏感的正则匹配。

use regex::RegexBuilder;
use serde::Serialize;

use crate::error::ForensicError;

/// 十六进制搜索命中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HexMatch {
    pub offset: usize,
    pub pattern: String,
    /// 命中位置前后若干字节的十六进制表示。
    pub context: String,
}

/// 文本搜索命中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMatch {
    /// 行号，从 1 开始。
    pub line_number: usize,
    /// 命中在该行中的字节位置。
    pub position: usize,
    pub pattern: String,
    pub matched_text: String,
    pub context: String,
}

/// 模式搜索结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "matches", rename_all = "snake_case")]
pub enum PatternMatches {
    Hex(Vec<HexMatch>),
    Text(Vec<TextMatch>),
}

impl PatternMatches {
    pub fn len(&self) -> usize {
        match self {
            Self::Hex(m) => m.len(),
            Self::Text(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_printable_ascii(b: u8) -> bool {
    (32..=126).contains(&b)
}

/// 提取长度不小于 `min_length` 的可打印字符串，最多 `max_strings` 条。
pub fn extract_strings(bytes: &[u8], min_length: usize, max_strings: usize) -> Vec<String> {
    let min_length = min_length.max(1);
    let mut strings = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if strings.len() >= max_strings {
            return strings;
        }

        if is_printable_ascii(b) {
            start.get_or_insert(i);
            continue;
        }

        if let Some(s) = start.take() {
            if i - s >= min_length {
                strings.push(String::from_utf8_lossy(&bytes[s..i]).into_owned());
            }
        }
    }

    if let Some(s) = start {
        if bytes.len() - s >= min_length && strings.len() < max_strings {
            strings.push(String::from_utf8_lossy(&bytes[s..]).into_owned());
        }
    }

    strings
}

/// 解析十六进制模式，允许空白与 `0x` 前缀。
pub fn parse_hex_pattern(pattern: &str) -> Result<Vec<u8>, ForensicError> {
    let trimmed = pattern.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body.bytes().filter(|b| !b.is_ascii_whitespace()).collect();

    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(ForensicError::InvalidParameter(format!(
            "十六进制模式长度必须为非零偶数：{}",
            pattern
        )));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16);
            let lo = (pair[1] as char).to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => Err(ForensicError::InvalidParameter(format!(
                    "十六进制模式包含非法字符：{}",
                    pattern
                ))),
            }
        })
        .collect()
}

/// 小写十六进制编码。
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn search_hex_pattern(
    bytes: &[u8],
    pattern: &str,
    context_bytes: usize,
) -> Result<Vec<HexMatch>, ForensicError> {
    let needle = parse_hex_pattern(pattern)?;
    if needle.len() > bytes.len() {
        return Ok(Vec::new());
    }

    let matches = bytes
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle.as_slice())
        .map(|(offset, _)| {
            let start = offset.saturating_sub(context_bytes);
            let end = (offset + needle.len() + context_bytes).min(bytes.len());
            HexMatch {
                offset,
                pattern: pattern.to_string(),
                context: to_hex(&bytes[start..end]),
            }
        })
        .collect();

    Ok(matches)
}

pub fn search_text_pattern(bytes: &[u8], pattern: &str) -> Result<Vec<TextMatch>, ForensicError> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ForensicError::InvalidParameter(format!("正则表达式无效：{}", e)))?;

    let text = String::from_utf8_lossy(bytes);
    let mut matches = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        for m in regex.find_iter(line) {
            matches.push(TextMatch {
                line_number: idx + 1,
                position: m.start(),
                pattern: pattern.to_string(),
                matched_text: m.as_str().to_string(),
                context: line.to_string(),
            });
        }
    }

    Ok(matches)
}

/// 按模式类型分派搜索。
pub fn search_patterns(
    bytes: &[u8],
    pattern: &str,
    is_hex: bool,
    context_bytes: usize,
) -> Result<PatternMatches, ForensicError> {
    if is_hex {
        search_hex_pattern(bytes, pattern, context_bytes).map(PatternMatches::Hex)
    } else {
        search_text_pattern(bytes, pattern).map(PatternMatches::Text)
    }
}
