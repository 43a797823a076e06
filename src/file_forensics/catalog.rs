//! 文件签名目录
//!
//! # 设计思路
//!
//! 以“有序条目列表”保存已知的 magic bytes，而不是以标签为键的映射：
//! - 按声明顺序扫描，第一个前缀匹配的条目胜出，顺序本身就是裁决规则；
//! - 允许同一标签出现多次（例如 GIF 的两个版本头）。
//!
//! 因此更具体的容器（Office Open XML）必须排在通用 ZIP 之前。
//!
//! # 实现思路
//!
//! - 内置目录通过 `once_cell::sync::Lazy` 在首次使用时构建，之后只读共享。
//! - 比较长度取 `min(magic.len(), signature.len())`，文件尾部不足 16 字节时不会越界。
//! - 空签名无法证明任何前缀，直接返回 `Unknown`。

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::ForensicError;

/// 签名读取窗口：只看文件前 16 个字节。
pub const SIGNATURE_WINDOW: usize = 16;

/// 无任何条目匹配时返回的标签。
pub const UNKNOWN_LABEL: &str = "Unknown";

/// 单条签名：标签 + magic bytes。
///
/// 字段私有，只能经由 [`SignatureEntry::new`] 构建，magic 长度恒在 1~16 之间。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureEntry {
    label: String,
    magic: Vec<u8>,
}

impl SignatureEntry {
    pub fn new(label: impl Into<String>, magic: impl Into<Vec<u8>>) -> Result<Self, ForensicError> {
        let magic = magic.into();
        if magic.is_empty() || magic.len() > SIGNATURE_WINDOW {
            return Err(ForensicError::InvalidParameter(format!(
                "magic bytes 长度必须在 1~{} 之间，实际为 {}",
                SIGNATURE_WINDOW,
                magic.len()
            )));
        }
        Ok(Self {
            label: label.into(),
            magic,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn magic(&self) -> &[u8] {
        &self.magic
    }

    fn matches(&self, signature: &[u8]) -> bool {
        let len = self.magic.len().min(signature.len());
        self.magic[..len] == signature[..len]
    }
}

/// 只读的签名目录。
#[derive(Debug, Clone)]
pub struct SignatureCatalog {
    entries: Vec<SignatureEntry>,
}

static BUILTIN_CATALOG: Lazy<SignatureCatalog> = Lazy::new(|| SignatureCatalog {
    entries: BUILTIN_SIGNATURES
        .iter()
        .map(|(label, magic)| SignatureEntry {
            label: (*label).to_string(),
            magic: magic.to_vec(),
        })
        .collect(),
});

/// 内置签名，顺序即优先级。
const BUILTIN_SIGNATURES: &[(&str, &[u8])] = &[
    ("JPEG", &[0xFF, 0xD8, 0xFF]),
    ("PNG", &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
    ("GIF", b"GIF87a"),
    ("GIF", b"GIF89a"),
    ("BMP", &[0x42, 0x4D]),
    ("PDF", &[0x25, 0x50, 0x44, 0x46]),
    ("DOCX/XLSX/PPTX", &[0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x06, 0x00]),
    ("ZIP", &[0x50, 0x4B, 0x03, 0x04]),
    ("RAR", &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07]),
    ("7Z", &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]),
    ("DOC", &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
    ("EXE", &[0x4D, 0x5A]),
];

impl SignatureCatalog {
    /// 用自定义条目构建目录，条目顺序即匹配优先级。
    pub fn new(entries: Vec<SignatureEntry>) -> Self {
        Self { entries }
    }

    /// 从 `(标签, magic)` 列表构建目录，任一条目不合法即整体失败。
    pub fn from_pairs<L, M>(pairs: impl IntoIterator<Item = (L, M)>) -> Result<Self, ForensicError>
    where
        L: Into<String>,
        M: Into<Vec<u8>>,
    {
        let entries = pairs
            .into_iter()
            .map(|(label, magic)| SignatureEntry::new(label, magic))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// 进程级共享的内置目录。
    pub fn builtin() -> &'static SignatureCatalog {
        &BUILTIN_CATALOG
    }

    pub fn entries(&self) -> &[SignatureEntry] {
        &self.entries
    }

    /// 返回第一个前缀匹配条目的标签，无匹配时返回 `Unknown`。
    pub fn detect(&self, signature: &[u8]) -> &str {
        if signature.is_empty() {
            return UNKNOWN_LABEL;
        }

        let window = &signature[..signature.len().min(SIGNATURE_WINDOW)];
        self.entries
            .iter()
            .find(|entry| entry.matches(window))
            .map(|entry| entry.label.as_str())
            .unwrap_or(UNKNOWN_LABEL)
    }
}

/// 使用内置目录识别文件类型。
///
/// 传入文件开头的字节即可，超过 16 字节的部分会被忽略。
pub fn detect_type(signature: &[u8]) -> &'static str {
    SignatureCatalog::builtin().detect(signature)
}

/// 截取签名窗口（不足 16 字节时返回全部）。
pub fn read_signature(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(SIGNATURE_WINDOW)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn detects_common_formats() {
        assert_eq!(detect_type(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]), "JPEG");
        assert_eq!(
            detect_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            "PNG"
        );
        assert_eq!(detect_type(b"%PDF-1.7\n"), "PDF");
        assert_eq!(detect_type(b"MZ\x90\x00\x03\x00"), "EXE");
    }

    #[test]
    fn both_gif_versions_share_a_label() {
        assert_eq!(detect_type(b"GIF87a\x01\x00"), "GIF");
        assert_eq!(detect_type(b"GIF89a\x01\x00"), "GIF");
    }

    #[test]
    fn office_container_wins_over_generic_zip() {
        let docx = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x06, 0x00, 0x08, 0x00];
        let zip = [0x50, 0x4B, 0x03, 0x04, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00];

        assert_eq!(detect_type(&docx), "DOCX/XLSX/PPTX");
        assert_eq!(detect_type(&zip), "ZIP");
    }

    #[test]
    fn empty_and_unmatched_signatures_are_unknown() {
        assert_eq!(detect_type(&[]), UNKNOWN_LABEL);
        assert_eq!(detect_type(&[0x00]), UNKNOWN_LABEL);
        assert_eq!(detect_type(b"hello world"), UNKNOWN_LABEL);
    }

    #[test]
    fn truncated_signature_compares_available_prefix() {
        assert_eq!(detect_type(&[0xFF, 0xD8]), "JPEG");
    }

    #[test]
    fn bytes_beyond_window_are_ignored() {
        let mut bytes = vec![0u8; 64];
        bytes[20..23].copy_from_slice(&[0xFF, 0xD8, 0xFF]);

        assert_eq!(detect_type(&bytes), UNKNOWN_LABEL);
        assert_eq!(read_signature(&bytes).len(), SIGNATURE_WINDOW);
    }

    #[test]
    fn custom_catalog_keeps_declaration_order() {
        let catalog = SignatureCatalog::new(vec![
            SignatureEntry::new("FIRST", vec![0xAA]).expect("entry"),
            SignatureEntry::new("SECOND", vec![0xAA, 0xBB]).expect("entry"),
        ]);

        assert_eq!(catalog.detect(&[0xAA, 0xBB, 0xCC]), "FIRST");
    }

    #[test]
    fn entry_rejects_oversized_magic() {
        let result = SignatureEntry::new("TOO_LONG", vec![0u8; SIGNATURE_WINDOW + 1]);

        assert!(matches!(result, Err(ForensicError::InvalidParameter(_))));
    }

    #[test]
    fn empty_magic_cannot_shadow_later_entries() {
        assert!(matches!(
            SignatureEntry::new("EMPTY", Vec::new()),
            Err(ForensicError::InvalidParameter(_))
        ));

        let pairs: Vec<(&str, Vec<u8>)> =
            vec![("EMPTY", vec![]), ("LONG", vec![0xAB; 40]), ("JPEG", vec![0xFF, 0xD8, 0xFF])];
        assert!(matches!(
            SignatureCatalog::from_pairs(pairs),
            Err(ForensicError::InvalidParameter(_))
        ));
    }

    #[test]
    fn builtin_entries_respect_magic_bounds() {
        for entry in SignatureCatalog::builtin().entries() {
            assert!(!entry.label().is_empty());
            assert!((1..=SIGNATURE_WINDOW).contains(&entry.magic().len()));
        }
    }

    #[test]
    fn catalog_from_pairs_keeps_order() {
        let catalog = SignatureCatalog::from_pairs([("CLASS", vec![0xCA, 0xFE]), ("ANY_CA", vec![0xCA])])
            .expect("catalog");

        assert_eq!(catalog.detect(&[0xCA, 0xFE, 0xBA, 0xBE]), "CLASS");
        assert_eq!(catalog.detect(&[0xCA, 0x00]), "ANY_CA");
        assert_eq!(catalog.detect(&[0xFF, 0xD8, 0xFF]), UNKNOWN_LABEL);
    }

    proptest! {
        #[test]
        fn detect_type_is_total(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let label = detect_type(&bytes);
            prop_assert!(!label.is_empty());
        }
    }
}
