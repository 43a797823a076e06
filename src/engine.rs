//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ForensicsEngine` 只负责持有“只读配置 + 外部协作方”，各分析能力以 `impl` 块的形式
//! 分布在 `file_forensics::service` 与 `image_forensics::handler` 中。
//!
//! - 配置在构造时校验，之后以 `Arc<ForensicsConfig>` 只读共享，不提供运行期修改入口。
//! - 编解码器、哈希器、MIME 嗅探器均为 trait 对象，便于测试替换。
//! - 引擎本身无可变状态，可在多个线程间克隆共享。

use std::sync::Arc;

use crate::config::ForensicsConfig;
use crate::error::ForensicError;
use crate::file_forensics::{InferSniffer, MimeSniffer, SignatureCatalog};
use crate::hashing::{ContentHasher, DigestHasher};
use crate::image_forensics::{ImageCodec, RasterCodec};

/// 取证分析引擎。
#[derive(Clone)]
pub struct ForensicsEngine {
    pub(crate) config: Arc<ForensicsConfig>,
    pub(crate) catalog: Arc<SignatureCatalog>,
    pub(crate) codec: Arc<dyn ImageCodec>,
    pub(crate) hasher: Arc<dyn ContentHasher>,
    pub(crate) sniffer: Arc<dyn MimeSniffer>,
}

impl ForensicsEngine {
    /// 使用默认协作方创建引擎。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use forensic_lens::{config::ForensicsConfig, engine::ForensicsEngine};
    ///
    /// let engine = ForensicsEngine::new(ForensicsConfig::default())?;
    /// # Ok::<(), forensic_lens::error::ForensicError>(())
    /// ```
    pub fn new(config: ForensicsConfig) -> Result<Self, ForensicError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(SignatureCatalog::builtin().clone()),
            codec: Arc::new(RasterCodec),
            hasher: Arc::new(DigestHasher),
            sniffer: Arc::new(InferSniffer),
        })
    }

    pub fn with_catalog(mut self, catalog: SignatureCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_sniffer(mut self, sniffer: Arc<dyn MimeSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn config(&self) -> &ForensicsConfig {
        &self.config
    }

    /// 校验输入体积是否超过配置上限。
    pub(crate) fn ensure_input_size(&self, bytes: &[u8]) -> Result<(), ForensicError> {
        let len = bytes.len() as u64;
        if len > self.config.max_file_size {
            return Err(ForensicError::ResourceLimit(format!(
                "输入过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config_at_construction() {
        let mut config = ForensicsConfig::default();
        config.entropy_window = 0;

        assert!(matches!(
            ForensicsEngine::new(config),
            Err(ForensicError::InvalidParameter(_))
        ));
    }

    #[test]
    fn input_size_guard_uses_configured_limit() {
        let mut config = ForensicsConfig::default();
        config.max_file_size = 8;
        let engine = ForensicsEngine::new(config).expect("engine init failed");

        assert!(engine.ensure_input_size(&[0u8; 8]).is_ok());
        assert!(matches!(
            engine.ensure_input_size(&[0u8; 9]),
            Err(ForensicError::ResourceLimit(_))
        ));
    }
}
