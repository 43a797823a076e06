//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 取证引擎的所有算子都是纯计算，没有值得重试的瞬时故障。
//! 因此错误只负责“分类 + 人类可读描述”，由外层服务自行转换为传输层响应。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息，调用侧可按分支匹配。
//! - 编解码器错误原样携带底层信息，不做吞并或改写。
//! - 实现 `Serialize` 将错误序列化为字符串，便于 JSON 输出。

use serde::Serialize;

/// 取证分析统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ForensicError {
    /// 输入格式不适用于该算子（例如对 PNG 执行 ELA）
    #[error("不支持的格式：{0}")]
    UnsupportedFormat(String),

    /// 未知的颜色滤镜名称
    #[error("不支持的滤镜：{0}")]
    UnsupportedFilter(String),

    /// 未知的哈希算法名称
    #[error("不支持的算法：{0}")]
    UnsupportedAlgorithm(String),

    /// 编解码器无法解析字节流
    #[error("解码错误：{0}")]
    Decode(String),

    /// PNG / JPEG 编码失败
    #[error("编码错误：{0}")]
    Encode(String),

    /// 参数越界或格式错误
    #[error("参数无效：{0}")]
    InvalidParameter(String),

    /// 输入体积或像素数超过配置上限
    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 配置文件解析失败
    #[error("配置错误：{0}")]
    Config(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误：{0}")]
    Io(#[from] std::io::Error),
}

impl Serialize for ForensicError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_display_string() {
        let err = ForensicError::UnsupportedFilter("sepia".to_string());
        let json = serde_json::to_string(&err).expect("serialize failed");

        assert_eq!(json, "\"不支持的滤镜：sepia\"");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ForensicError = io.into();

        assert!(matches!(err, ForensicError::Io(_)));
    }
}
