//! 内容哈希模块
//!
//! # 设计思路
//!
//! 取证核心只“消费”哈希能力（ELA 审计、文件指纹、哈希校验），不实现密码学原语。
//! 因此以 `ContentHasher` trait 作为注入点，默认实现委托给 RustCrypto 的
//! `md-5` / `sha1` / `sha2` / `sha3`，它们共用同一套 `Digest` 接口。
//!
//! MD5 与 SHA-1 已不具备抗碰撞性，保留它们是因为案件材料中的既有哈希值多为这两种。
//!
//! # 实现思路
//!
//! - 算法名大小写不敏感，短横线与下划线可省略（`SHA-256` / `sha256` 等价，`SHA3-256` 归一为 `SHA3256`）。
//! - 未知算法返回 `UnsupportedAlgorithm`，不回退到默认算法。
//! - 摘要统一输出为小写十六进制。

use std::collections::BTreeMap;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_256, Sha3_512};

use crate::error::ForensicError;

/// ELA 审计与文件指纹使用的默认算法。
pub const DEFAULT_ALGORITHM: &str = "SHA-256";

/// 支持的哈希算法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 8] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha3_256,
        Self::Sha3_512,
    ];

    /// 从外部算法名解析。
    pub fn parse(name: &str) -> Result<Self, ForensicError> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();

        match normalized.as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA1" => Ok(Self::Sha1),
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            "SHA3256" => Ok(Self::Sha3_256),
            "SHA3512" => Ok(Self::Sha3_512),
            _ => Err(ForensicError::UnsupportedAlgorithm(format!(
                "{}（可选：{}）",
                name,
                Self::ALL.map(Self::as_str).join(" / ")
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Sha3_256 => "SHA3-256",
            Self::Sha3_512 => "SHA3-512",
        }
    }

    /// 十六进制摘要长度。
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha224 => 56,
            Self::Sha256 | Self::Sha3_256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 | Self::Sha3_512 => 128,
        }
    }
}

/// 字节哈希能力（外部协作方）。
pub trait ContentHasher: Send + Sync {
    /// 计算 `bytes` 的十六进制摘要。
    fn hash_hex(&self, bytes: &[u8], algorithm: &str) -> Result<String, ForensicError>;

    /// 当前实现支持的算法名，按稳定顺序返回。
    fn supported_algorithms(&self) -> Vec<&'static str>;
}

/// 基于 RustCrypto `Digest` 系列 crate 的默认实现。
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestHasher;

impl ContentHasher for DigestHasher {
    fn hash_hex(&self, bytes: &[u8], algorithm: &str) -> Result<String, ForensicError> {
        let hex = match HashAlgorithm::parse(algorithm)? {
            HashAlgorithm::Md5 => format!("{:x}", Md5::digest(bytes)),
            HashAlgorithm::Sha1 => format!("{:x}", Sha1::digest(bytes)),
            HashAlgorithm::Sha224 => format!("{:x}", Sha224::digest(bytes)),
            HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
            HashAlgorithm::Sha384 => format!("{:x}", Sha384::digest(bytes)),
            HashAlgorithm::Sha512 => format!("{:x}", Sha512::digest(bytes)),
            HashAlgorithm::Sha3_256 => format!("{:x}", Sha3_256::digest(bytes)),
            HashAlgorithm::Sha3_512 => format!("{:x}", Sha3_512::digest(bytes)),
        };
        Ok(hex)
    }

    fn supported_algorithms(&self) -> Vec<&'static str> {
        HashAlgorithm::ALL.iter().map(|a| a.as_str()).collect()
    }
}

/// 用全部支持的算法计算摘要。
pub fn calculate_hashes(
    hasher: &dyn ContentHasher,
    bytes: &[u8],
) -> Result<BTreeMap<String, String>, ForensicError> {
    let mut hashes = BTreeMap::new();
    for algorithm in hasher.supported_algorithms() {
        hashes.insert(algorithm.to_string(), hasher.hash_hex(bytes, algorithm)?);
    }
    Ok(hashes)
}
