//! 有界缓存存储
//!
//! 单个命名空间的内存存储，支持：
//! - 容量限制：写入新键且已满时淘汰一个条目
//! - TTL 过期：读取时惰性删除，没有后台清扫
//! - 两种淘汰顺序：按插入顺序（默认）或按最近访问
//!
//! # 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use crate::data::cache::{BoundedStore, EvictionPolicy, SystemClock};
//!
//! let mut store = BoundedStore::new(50, Duration::from_secs(86400), EvictionPolicy::Insertion, Arc::new(SystemClock));
//! store.put(key.clone(), serde_json::json!({"payment": 42}));
//! assert!(store.get(&key).is_some());
//! ```

use chrono::{DateTime, Utc};
use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::clock::Clock;
use super::key::CacheKey;
use crate::models::ResultRecord;

/// 淘汰策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// 淘汰最早插入的条目，读取不影响顺序
    #[default]
    Insertion,
    /// 淘汰最久未访问的条目，每次命中都会刷新位置
    #[serde(rename = "lru")]
    LeastRecentlyUsed,
}

/// 缓存条目，包含值和创建时间
///
/// 条目只会被整体替换，不会原地修改。
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: ResultRecord,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: ResultRecord, created_at: DateTime<Utc>) -> Self {
        Self { value, created_at }
    }

    /// 条目年龄（创建时间在未来时视为 0）
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }

    /// 年龄超过 TTL 即过期
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }
}

/// 有界存储
///
/// 使用 `LinkedHashMap` 维护插入顺序，队首即下一个淘汰对象。
#[derive(Debug)]
pub struct BoundedStore {
    entries: LinkedHashMap<CacheKey, CacheEntry>,
    capacity: usize,
    ttl: Duration,
    policy: EvictionPolicy,
    clock: Arc<dyn Clock>,
}

impl BoundedStore {
    /// 创建新的有界存储
    ///
    /// # 参数
    ///
    /// - `capacity`: 最大条目数
    /// - `ttl`: 条目生存时间
    /// - `policy`: 淘汰策略
    /// - `clock`: 时间源
    pub fn new(
        capacity: usize,
        ttl: Duration,
        policy: EvictionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: LinkedHashMap::new(),
            capacity,
            ttl,
            policy,
            clock,
        }
    }

    /// 获取缓存值
    ///
    /// 存在且未过期时返回 `Some`；已过期的条目会先被删除再返回 `None`。
    pub fn get(&mut self, key: &CacheKey) -> Option<&ResultRecord> {
        let now = self.clock.now();
        let expired = self.entries.get(key)?.is_expired(now, self.ttl);
        if expired {
            self.entries.remove(key);
            return None;
        }

        match self.policy {
            EvictionPolicy::Insertion => self.entries.get(key).map(|entry| &entry.value),
            EvictionPolicy::LeastRecentlyUsed => {
                self.entries.get_refresh(key).map(|entry| &entry.value)
            }
        }
    }

    /// 只读查看条目（不做过期删除，也不刷新顺序）
    pub fn peek(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// 写入缓存值
    ///
    /// 已存在的键被整体替换并移到队尾；新键在存储已满时先淘汰队首条目。
    /// 返回被淘汰的键。
    pub fn put(&mut self, key: CacheKey, value: ResultRecord) -> Option<CacheKey> {
        let mut evicted = None;
        if self.entries.remove(&key).is_none() && self.entries.len() >= self.capacity {
            evicted = self.entries.pop_front().map(|(k, _)| k);
        }

        let entry = CacheEntry::new(value, self.clock.now());
        self.entries.insert(key, entry);
        evicted
    }

    /// 从快照恢复条目
    ///
    /// 保留原有创建时间和顺序，跳过已过期条目，超出容量时丢弃最旧的。
    pub fn restore<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (CacheKey, CacheEntry)>,
    {
        let now = self.clock.now();
        for (key, entry) in entries {
            if entry.is_expired(now, self.ttl) {
                continue;
            }
            self.entries.remove(&key);
            self.entries.insert(key, entry);
        }
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// 删除指定键
    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    /// 清空所有条目
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 按淘汰顺序遍历（队首最先淘汰）
    pub fn entries(&self) -> impl Iterator<Item = (&CacheKey, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cache::key::build_key;
    use crate::data::cache::ManualClock;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(24 * 3600);

    fn store(capacity: usize, policy: EvictionPolicy) -> (BoundedStore, ManualClock) {
        let clock = ManualClock::default();
        let store = BoundedStore::new(capacity, TTL, policy, Arc::new(clock.clone()));
        (store, clock)
    }

    fn key(n: usize) -> CacheKey {
        build_key("loan", &format!("k{n}"))
    }

    #[test]
    fn test_basic_put_and_get() {
        let (mut store, _) = store(10, EvictionPolicy::Insertion);
        store.put(key(1), json!({"payment": 100}));
        assert_eq!(store.get(&key(1)), Some(&json!({"payment": 100})));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let (mut store, _) = store(10, EvictionPolicy::Insertion);
        assert!(store.get(&key(1)).is_none());
    }

    #[test]
    fn test_capacity_bound_evicts_earliest_inserted() {
        let capacity = 5;
        let extra = 3;
        let (mut store, _) = store(capacity, EvictionPolicy::Insertion);
        for n in 0..capacity + extra {
            store.put(key(n), json!(n));
        }

        assert_eq!(store.len(), capacity);
        for n in 0..extra {
            assert!(store.peek(&key(n)).is_none(), "k{n} 应被淘汰");
        }
        for n in extra..capacity + extra {
            assert!(store.peek(&key(n)).is_some(), "k{n} 应保留");
        }
    }

    #[test]
    fn test_put_reports_evicted_key() {
        let (mut store, _) = store(2, EvictionPolicy::Insertion);
        assert!(store.put(key(1), json!(1)).is_none());
        assert!(store.put(key(2), json!(2)).is_none());
        assert_eq!(store.put(key(3), json!(3)), Some(key(1)));
    }

    #[test]
    fn test_insertion_order_ignores_reads() {
        let (mut store, _) = store(3, EvictionPolicy::Insertion);
        store.put(key(1), json!(1));
        store.put(key(2), json!(2));
        store.put(key(3), json!(3));

        // 频繁读取最旧的条目并不能让它免于淘汰
        for _ in 0..5 {
            assert!(store.get(&key(1)).is_some());
        }

        store.put(key(4), json!(4));
        assert!(store.get(&key(1)).is_none());
        assert!(store.get(&key(2)).is_some());
    }

    #[test]
    fn test_lru_policy_refreshes_on_read() {
        let (mut store, _) = store(3, EvictionPolicy::LeastRecentlyUsed);
        store.put(key(1), json!(1));
        store.put(key(2), json!(2));
        store.put(key(3), json!(3));

        store.get(&key(1));
        store.put(key(4), json!(4));

        assert!(store.get(&key(1)).is_some());
        assert!(store.get(&key(2)).is_none());
    }

    #[test]
    fn test_replace_existing_key_does_not_evict() {
        let (mut store, _) = store(2, EvictionPolicy::Insertion);
        store.put(key(1), json!("old"));
        store.put(key(2), json!(2));
        assert!(store.put(key(1), json!("new")).is_none());

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&key(1)), Some(&json!("new")));

        // 被替换的键移到队尾，下一次淘汰的是 k2
        store.put(key(3), json!(3));
        assert!(store.peek(&key(2)).is_none());
        assert!(store.peek(&key(1)).is_some());
    }

    #[test]
    fn test_expiry_boundary() {
        let (mut store, clock) = store(10, EvictionPolicy::Insertion);
        store.put(key(1), json!(1));

        clock.advance(TTL - Duration::from_secs(1));
        assert!(store.get(&key(1)).is_some());

        clock.advance(Duration::from_secs(2));
        assert!(store.get(&key(1)).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_expired_entry_only_removed_on_read() {
        let (mut store, clock) = store(10, EvictionPolicy::Insertion);
        store.put(key(1), json!(1));
        store.put(key(2), json!(2));
        clock.advance(TTL + Duration::from_secs(1));

        assert_eq!(store.len(), 2);
        assert!(store.get(&key(1)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_restore_skips_expired_and_trims() {
        let (mut store, clock) = store(2, EvictionPolicy::Insertion);
        let now = clock.now();
        let stale = CacheEntry::new(json!("stale"), now - chrono::Duration::hours(25));
        let fresh = |n: i64| CacheEntry::new(json!(n), now - chrono::Duration::minutes(n));

        store.restore(vec![
            (key(0), stale),
            (key(1), fresh(3)),
            (key(2), fresh(2)),
            (key(3), fresh(1)),
        ]);

        assert_eq!(store.len(), 2);
        assert!(store.peek(&key(0)).is_none());
        assert!(store.peek(&key(1)).is_none());
        assert_eq!(store.peek(&key(3)).unwrap().created_at, now - chrono::Duration::minutes(1));
    }

    #[test]
    fn test_clear() {
        let (mut store, _) = store(10, EvictionPolicy::Insertion);
        store.put(key(1), json!(1));
        store.put(key(2), json!(2));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove() {
        let (mut store, _) = store(10, EvictionPolicy::Insertion);
        store.put(key(1), json!(1));
        assert_eq!(store.remove(&key(1)).map(|e| e.value), Some(json!(1)));
        assert!(store.get(&key(1)).is_none());
    }

    #[test]
    fn test_entry_age_for_future_timestamp() {
        let now = Utc::now();
        let entry = CacheEntry::new(json!(1), now + chrono::Duration::minutes(5));
        assert_eq!(entry.age(now), Duration::ZERO);
        assert!(!entry.is_expired(now, Duration::from_secs(1)));
    }

    #[test]
    fn test_eviction_policy_serde() {
        assert_eq!(
            serde_json::to_string(&EvictionPolicy::LeastRecentlyUsed).unwrap(),
            "\"lru\""
        );
        assert_eq!(
            serde_json::from_str::<EvictionPolicy>("\"insertion\"").unwrap(),
            EvictionPolicy::Insertion
        );
    }
}
