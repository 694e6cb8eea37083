use serde::Deserialize;
use thiserror::Error;

/// [`SlabPagePool`](crate::SlabPagePool) 的配置项。
///
/// ## 意图（Why）
/// - 页池是跨写入器共享的内存来源，需要显式约束“缓存多少空闲页”与“最多借出多少页”，
///   否则峰值写入过后空闲页会一直常驻；
/// - 支持从 TOML 片段加载，便于宿主把页池配置并入自己的配置文件。
///
/// ## 契约（What）
/// - `max_cached_pages`：自由链表最多缓存的空闲页数，超出部分在归还时直接释放；默认 64；
/// - `max_leased_pages`：同时借出的页数上限，`None` 表示不限；达到上限后租借返回
///   `buffer.allocation_failed`；
/// - 缺省字段取默认值，未知字段视为错误。
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SlabPoolConfig {
    pub max_cached_pages: usize,
    pub max_leased_pages: Option<usize>,
}

impl Default for SlabPoolConfig {
    fn default() -> Self {
        Self {
            max_cached_pages: 64,
            max_leased_pages: None,
        }
    }
}

impl SlabPoolConfig {
    pub fn with_max_cached_pages(mut self, pages: usize) -> Self {
        self.max_cached_pages = pages;
        self
    }

    pub fn with_max_leased_pages(mut self, pages: Option<usize>) -> Self {
        self.max_leased_pages = pages;
        self
    }

    /// 从 TOML 文本解析配置并校验。
    ///
    /// ```rust
    /// use quire_buffer::SlabPoolConfig;
    ///
    /// let config = SlabPoolConfig::from_toml_str("max_leased_pages = 8").unwrap();
    /// assert_eq!(config.max_leased_pages, Some(8));
    /// assert_eq!(config.max_cached_pages, 64);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_leased_pages == Some(0) {
            return Err(ConfigError::Invalid(
                "max_leased_pages 为 0 时页池无法借出任何页",
            ));
        }
        Ok(())
    }
}

/// 页池配置加载错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法解析页池配置: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("页池配置非法: {0}")]
    Invalid(&'static str),
}
