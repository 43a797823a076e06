//! MIME 嗅探
//!
//! # 设计思路
//!
//! 内容嗅探属于外部协作方：核心只关心“给定字节，返回最可能的 MIME 字符串”。
//! 默认实现基于 `infer` 的 magic bytes 识别；`infer` 无法识别时，
//! 可打印的 UTF-8 视为 `text/plain`，其余一律 `application/octet-stream`。

/// 内容嗅探能力。
pub trait MimeSniffer: Send + Sync {
    fn sniff(&self, bytes: &[u8]) -> String;
}

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

/// 判定文本时最多检查的前缀长度。
const TEXT_PROBE_BYTES: usize = 8192;

/// 基于 `infer` 的默认实现。
#[derive(Debug, Default, Clone, Copy)]
pub struct InferSniffer;

impl MimeSniffer for InferSniffer {
    fn sniff(&self, bytes: &[u8]) -> String {
        if let Some(kind) = infer::get(bytes) {
            return kind.mime_type().to_string();
        }

        if looks_like_text(bytes) {
            TEXT_PLAIN.to_string()
        } else {
            OCTET_STREAM.to_string()
        }
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }

    let probe = &bytes[..bytes.len().min(TEXT_PROBE_BYTES)];
    // 截断可能切在多字节字符中间，只要错误出现在末尾即可接受
    let valid = match std::str::from_utf8(probe) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => {
            match std::str::from_utf8(&probe[..e.valid_up_to()]) {
                Ok(text) => text,
                Err(_) => return false,
            }
        }
        Err(_) => return false,
    };

    valid
        .chars()
        .all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_png_by_magic() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

        assert_eq!(InferSniffer.sniff(&png), "image/png");
    }

    #[test]
    fn plain_text_falls_back_to_text_plain() {
        assert_eq!(InferSniffer.sniff(b"hello\nworld\t!"), TEXT_PLAIN);
        assert_eq!(InferSniffer.sniff("取证 分析".as_bytes()), TEXT_PLAIN);
    }

    #[test]
    fn binary_noise_is_octet_stream() {
        assert_eq!(InferSniffer.sniff(&[0x00, 0x01, 0x02, 0xFE]), OCTET_STREAM);
        assert_eq!(InferSniffer.sniff(&[]), OCTET_STREAM);
    }
}
