// 应用配置结构，放在 models 以便在库和二进制之间共享
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::data::cache::{DigestAlgorithm, EvictionPolicy};
use crate::data::{CacheError, Result};

use super::record::LocaleBundle;

/// 应用全局配置（对应 `~/.calccache/config.toml`）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub locale: LocaleBundle,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub log: LogConfig,
}

/// 缓存配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// 每个命名空间的最大条目数
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// 条目生存时间（小时）
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// 持久化目录（None 表示 `~/.calccache/cache`）
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub eviction: EvictionPolicy,
    #[serde(default)]
    pub digest: DigestAlgorithm,
    /// 相同键的并发请求是否合并为一次计算
    #[serde(default)]
    pub single_flight: bool,
}

fn default_max_entries() -> usize {
    50
}

fn default_ttl_hours() -> u64 {
    24
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_hours: default_ttl_hours(),
            storage_dir: None,
            eviction: EvictionPolicy::default(),
            digest: DigestAlgorithm::default(),
            single_flight: false,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config("max_entries 必须大于 0".to_string()));
        }
        if self.ttl_hours == 0 {
            return Err(CacheError::Config("ttl_hours 必须大于 0".to_string()));
        }
        Ok(())
    }
}

/// 远程计算端点配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// 解析字符串为日志级别
    pub fn parse(level: &str) -> Option<LogLevel> {
        match level.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub output: LogOutput,
    /// 日志目录（None 表示 `~/.calccache/logs`）
    #[serde(default)]
    pub file_path: Option<String>,
}
