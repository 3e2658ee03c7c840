use serde::{Deserialize, Serialize};
use std::fmt;

/// 缓存结构版本标记
///
/// 缓存结果的含义发生变化时递增；旧键不再被生成，也就不会再被查到，无需迁移。
pub const SCHEMA_VERSION: &str = "v3";

/// 命名空间与摘要之间的分隔符
pub const KEY_SEPARATOR: char = ':';

/// 缓存键 `{namespace}:{digest}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 键所属的命名空间
    ///
    /// 摘要是 base-36 文本，不含分隔符，因此从最后一个分隔符处切分；
    /// 命名空间本身可以包含 `:`。
    pub fn namespace(&self) -> &str {
        self.0
            .rsplit_once(KEY_SEPARATOR)
            .map(|(namespace, _)| namespace)
            .unwrap_or(&self.0)
    }

    /// 键中的摘要部分
    pub fn digest(&self) -> &str {
        self.0
            .rsplit_once(KEY_SEPARATOR)
            .map(|(_, digest)| digest)
            .unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 拼接缓存键
pub fn build_key(namespace: &str, digest: &str) -> CacheKey {
    CacheKey(format!("{namespace}{KEY_SEPARATOR}{digest}"))
}
