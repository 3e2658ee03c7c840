//! 统一错误类型定义
//!
//! 使用 `thiserror` 定义缓存模块的所有错误类型。
//! 这些错误只在存储/配置层之间传递；缓存读写路径上会被记录日志后吞掉，
//! 不会影响调用方拿到的计算结果。

use std::path::PathBuf;
use thiserror::Error;

/// 缓存模块的统一错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON 序列化/反序列化错误
    #[error("JSON 序列化错误: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// TOML 反序列化错误
    #[error("TOML 反序列化错误: {0}")]
    TomlDeserialization(#[from] toml::de::Error),

    /// 持久化存储空间不足
    #[error("存储空间不足: 槽位 {slot} 需要 {required} 字节，剩余 {available} 字节")]
    QuotaExceeded {
        slot: String,
        required: usize,
        available: usize,
    },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 并发错误
    #[error("并发错误: {0}")]
    Concurrency(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
