//! 缓存层实现
//!
//! 提供计算结果缓存的各个组成部分：
//! - `normalizer`: 输入规范化
//! - `digest`: 规范记录摘要
//! - `key`: 缓存键拼接
//! - `bounded`: 有界内存存储（容量 + TTL）
//! - `snapshot`: 命名空间快照持久化
//! - `clock`: 可注入的时间源

pub mod bounded;
pub mod clock;
pub mod digest;
pub mod key;
pub mod normalizer;
pub mod snapshot;

pub use bounded::{BoundedStore, CacheEntry, EvictionPolicy};
pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::ManualClock;
pub use digest::{digest, DigestAlgorithm};
pub use key::{build_key, CacheKey, SCHEMA_VERSION};
pub use normalizer::{CanonicalRecord, Normalizer};
pub use snapshot::{slot_name, SnapshotStore};
