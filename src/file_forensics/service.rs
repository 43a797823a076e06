//! # 文件取证服务
//!
//! ## 设计思路
//!
//! 将签名识别、MIME 嗅探、熵、哈希、字符串提取组合成面向调用方的报告。
//! 每个方法都是输入字节的纯函数，不缓存、不落盘。
//!
//! ## 实现思路
//!
//! - 入口先做体积校验，超限直接失败。
//! - `possible_mismatch` 只是启发式：扩展名不是检测到的 MIME 的子串即视为可疑，
//!   不能作为伪装的证明。

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use super::catalog::read_signature;
use super::entropy::entropy_with_window;
use super::strings::{extract_strings, search_patterns, to_hex, PatternMatches};
use crate::engine::ForensicsEngine;
use crate::error::ForensicError;
use crate::hashing::calculate_hashes;

/// 文本类文件附带的样本行数。
const SAMPLE_CONTENT_LINES: usize = 50;

/// 文件签名分析报告。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSignatureReport {
    pub filename: String,
    pub declared_content_type: Option<String>,
    pub extension: String,
    pub detected_mime_type: String,
    pub hex_signature: String,
    pub detected_type: String,
    /// 启发式结果，仅作提示。
    pub possible_mismatch: bool,
}

/// 文件结构分析报告。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStructureReport {
    pub filename: String,
    pub file_size: usize,
    pub mime_type: String,
    /// 文本类文件：前若干行。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_content: Option<String>,
    /// 二进制文件：前 `entropy_window` 字节的熵。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy_score: Option<f64>,
}

/// 哈希校验结果。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashVerification {
    pub provided_hash: String,
    pub calculated_hash: String,
    pub algorithm: String,
    pub matches: bool,
}

/// 取文件扩展名（不含点）。
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 扩展名与嗅探结果是否可能不一致。
///
/// 扩展名为空时不判定；否则只要扩展名（大小写不敏感）不是 MIME 的子串就标记。
/// 例如 `jpg` 与 `image/jpeg` 相容，而 `txt` 与 `application/pdf` 不相容。
pub fn possible_mismatch(detected_mime: &str, extension: &str) -> bool {
    !extension.is_empty()
        && !detected_mime
            .to_lowercase()
            .contains(&extension.to_lowercase())
}

fn is_text_like(mime: &str) -> bool {
    mime.starts_with("text/") || mime.contains("json") || mime.contains("xml")
}

impl ForensicsEngine {
    pub fn analyze_file_signature(
        &self,
        bytes: &[u8],
        filename: &str,
        declared_content_type: Option<&str>,
    ) -> Result<FileSignatureReport, ForensicError> {
        self.ensure_input_size(bytes)?;

        let extension = file_extension(filename);
        let detected_mime_type = self.sniffer.sniff(bytes);
        let signature = read_signature(bytes);
        let detected_type = self.catalog.detect(signature).to_string();
        let mismatch = possible_mismatch(&detected_mime_type, &extension);

        log::info!(
            "🔎 签名分析 - 文件: {} 类型: {} MIME: {} 可疑: {}",
            filename,
            detected_type,
            detected_mime_type,
            mismatch
        );

        Ok(FileSignatureReport {
            filename: filename.to_string(),
            declared_content_type: declared_content_type.map(str::to_string),
            extension,
            detected_mime_type,
            hex_signature: to_hex(signature),
            detected_type,
            possible_mismatch: mismatch,
        })
    }

    pub fn analyze_file_structure(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<FileStructureReport, ForensicError> {
        self.ensure_input_size(bytes)?;
        let start = Instant::now();

        let mime_type = self.sniffer.sniff(bytes);
        let (sample_content, entropy_score) = if is_text_like(&mime_type) {
            let text = String::from_utf8_lossy(bytes);
            let sample = text
                .lines()
                .take(SAMPLE_CONTENT_LINES)
                .collect::<Vec<_>>()
                .join("\n");
            (Some(sample), None)
        } else {
            (None, Some(entropy_with_window(bytes, self.config.entropy_window)))
        };

        log::debug!(
            "结构分析完成 - 文件: {} MIME: {} 耗时: {}ms",
            filename,
            mime_type,
            start.elapsed().as_millis()
        );

        Ok(FileStructureReport {
            filename: filename.to_string(),
            file_size: bytes.len(),
            mime_type,
            sample_content,
            entropy_score,
        })
    }

    /// 计算配置窗口内的熵。
    pub fn entropy(&self, bytes: &[u8]) -> f64 {
        entropy_with_window(bytes, self.config.entropy_window)
    }

    pub fn calculate_hashes(&self, bytes: &[u8]) -> Result<BTreeMap<String, String>, ForensicError> {
        self.ensure_input_size(bytes)?;
        calculate_hashes(self.hasher.as_ref(), bytes)
    }

    pub fn verify_hash(
        &self,
        bytes: &[u8],
        provided_hash: &str,
        algorithm: &str,
    ) -> Result<HashVerification, ForensicError> {
        self.ensure_input_size(bytes)?;

        let calculated_hash = self.hasher.hash_hex(bytes, algorithm)?;
        let matches = calculated_hash.eq_ignore_ascii_case(provided_hash.trim());

        if !matches {
            log::warn!("⚠️ 哈希不一致 - 算法: {}", algorithm);
        }

        Ok(HashVerification {
            provided_hash: provided_hash.to_string(),
            calculated_hash,
            algorithm: algorithm.to_string(),
            matches,
        })
    }

    /// `min_length` 为 0 时使用配置默认值。
    pub fn extract_strings(&self, bytes: &[u8], min_length: usize) -> Result<Vec<String>, ForensicError> {
        self.ensure_input_size(bytes)?;

        let min_length = if min_length > 0 {
            min_length
        } else {
            self.config.min_string_length
        };
        Ok(extract_strings(bytes, min_length, self.config.max_extracted_strings))
    }

    pub fn search_patterns(
        &self,
        bytes: &[u8],
        pattern: &str,
        is_hex: bool,
    ) -> Result<PatternMatches, ForensicError> {
        self.ensure_input_size(bytes)?;

        let matches = search_patterns(bytes, pattern, is_hex, self.config.search_context_bytes)?;
        log::debug!("模式搜索完成 - 命中 {} 处", matches.len());
        Ok(matches)
    }
}
