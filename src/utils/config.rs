use crate::data::{CacheError, Result};
use crate::models::{AppConfig, LogLevel};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_MAX_ENTRIES: &str = "CALCCACHE_MAX_ENTRIES";
pub const ENV_TTL_HOURS: &str = "CALCCACHE_TTL_HOURS";
pub const ENV_STORAGE_DIR: &str = "CALCCACHE_STORAGE_DIR";
pub const ENV_ENDPOINT: &str = "CALCCACHE_ENDPOINT";
pub const ENV_LOG_LEVEL: &str = "CALCCACHE_LOG_LEVEL";

/// 配置目录 (~/.calccache)，若不存在则创建
pub fn config_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| CacheError::Config("无法获取用户主目录".to_string()))?;
    let config_dir = home_dir.join(".calccache");
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).map_err(|e| CacheError::io(&config_dir, e))?;
    }
    Ok(config_dir)
}

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// 默认缓存快照目录
pub fn default_cache_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("cache"))
}

/// 读取配置并应用环境变量覆盖
///
/// 显式指定的文件必须存在；默认路径下没有文件时使用默认配置。
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            let path = default_config_path()?;
            if path.exists() {
                read_config_file(&path)?
            } else {
                tracing::debug!(path = ?path, "配置文件不存在，使用默认配置");
                AppConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config)?;
    config.cache.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
    let config = toml::from_str(&content)?;
    tracing::debug!(path = ?path, "已读取配置文件");
    Ok(config)
}

/// 应用 `CALCCACHE_*` 环境变量
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Some(value) = env_value(ENV_MAX_ENTRIES) {
        config.cache.max_entries = parse_number(ENV_MAX_ENTRIES, &value)?;
    }
    if let Some(value) = env_value(ENV_TTL_HOURS) {
        config.cache.ttl_hours = parse_number(ENV_TTL_HOURS, &value)?;
    }
    if let Some(value) = env_value(ENV_STORAGE_DIR) {
        config.cache.storage_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = env_value(ENV_ENDPOINT) {
        config.http.endpoint = Some(value);
    }
    if let Some(value) = env_value(ENV_LOG_LEVEL) {
        config.log.level = LogLevel::parse(&value).ok_or_else(|| {
            CacheError::Config(format!("{ENV_LOG_LEVEL} 无效的日志级别: {value}"))
        })?;
    }
    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CacheError::Config(format!("{name} 不是有效的数字: {value}")))
}
