//! 命名空间快照持久化
//!
//! 每个命名空间在持久化存储中占一个槽位（`calccache:{namespace}`），
//! 保存该命名空间全部条目的 JSON 快照：
//! - 每次变更都整体重写快照（写入成本与条目数成正比）
//! - 加载时丢弃已过期条目；读取或解析失败视为空缓存
//! - 写入失败只记录日志，内存缓存在本次会话内仍然有效
//! - 多个写入方之间没有合并或锁，后写者胜出

use chrono::{DateTime, Utc};
use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::bounded::CacheEntry;
use super::clock::Clock;
use super::key::{CacheKey, SCHEMA_VERSION};
use crate::data::storage::DurableStorage;
use crate::data::Result;
use crate::models::ResultRecord;

/// 槽位名前缀
pub const SLOT_PREFIX: &str = "calccache";

/// 命名空间对应的槽位名
pub fn slot_name(namespace: &str) -> String {
    format!("{SLOT_PREFIX}:{namespace}")
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    schema: String,
    namespace: String,
    saved_at: DateTime<Utc>,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: CacheKey,
    value: ResultRecord,
    created_at: DateTime<Utc>,
}

/// 快照读写器
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    storage: Arc<dyn DurableStorage>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SnapshotStore {
    pub fn new(storage: Arc<dyn DurableStorage>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            ttl,
            clock,
        }
    }

    /// 加载命名空间快照
    ///
    /// 只返回仍在 TTL 内的条目，顺序与保存时一致。任何失败都返回空映射。
    pub fn load(&self, namespace: &str) -> LinkedHashMap<CacheKey, CacheEntry> {
        let slot = slot_name(namespace);
        let snapshot = match self.read_snapshot(&slot) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!(namespace = %namespace, "无持久化快照");
                return LinkedHashMap::new();
            }
            Err(e) => {
                tracing::warn!(namespace = %namespace, error = %e, "读取缓存快照失败，按空缓存处理");
                return LinkedHashMap::new();
            }
        };

        if snapshot.schema != SCHEMA_VERSION {
            tracing::debug!(
                namespace = %namespace,
                schema = %snapshot.schema,
                current = SCHEMA_VERSION,
                "快照版本不匹配，忽略旧条目"
            );
            return LinkedHashMap::new();
        }

        let now = self.clock.now();
        let total = snapshot.entries.len();
        let mut entries = LinkedHashMap::new();
        for item in snapshot.entries {
            if item.key.namespace() != namespace {
                continue;
            }
            let entry = CacheEntry::new(item.value, item.created_at);
            if entry.is_expired(now, self.ttl) {
                continue;
            }
            entries.insert(item.key, entry);
        }

        tracing::debug!(
            namespace = %namespace,
            loaded = entries.len(),
            discarded = total - entries.len(),
            "已加载缓存快照"
        );
        entries
    }

    /// 保存命名空间快照（整体覆盖）
    ///
    /// 返回是否写入成功；失败只记录日志。
    pub fn save<'a, I>(&self, namespace: &str, entries: I) -> bool
    where
        I: IntoIterator<Item = (&'a CacheKey, &'a CacheEntry)>,
    {
        let snapshot = Snapshot {
            schema: SCHEMA_VERSION.to_string(),
            namespace: namespace.to_string(),
            saved_at: self.clock.now(),
            entries: entries
                .into_iter()
                .map(|(key, entry)| SnapshotEntry {
                    key: key.clone(),
                    value: entry.value.clone(),
                    created_at: entry.created_at,
                })
                .collect(),
        };

        match self.write_snapshot(&slot_name(namespace), &snapshot) {
            Ok(()) => {
                tracing::trace!(
                    namespace = %namespace,
                    entries = snapshot.entries.len(),
                    "缓存快照已写入"
                );
                true
            }
            Err(e) => {
                tracing::warn!(namespace = %namespace, error = %e, "写入缓存快照失败，仅保留内存缓存");
                false
            }
        }
    }

    /// 删除命名空间快照
    pub fn remove(&self, namespace: &str) -> bool {
        match self.storage.remove(&slot_name(namespace)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(namespace = %namespace, error = %e, "删除缓存快照失败");
                false
            }
        }
    }

    fn read_snapshot(&self, slot: &str) -> Result<Option<Snapshot>> {
        match self.storage.get(slot)? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    fn write_snapshot(&self, slot: &str, snapshot: &Snapshot) -> Result<()> {
        let content = serde_json::to_string(snapshot)?;
        self.storage.set(slot, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cache::key::build_key;
    use crate::data::cache::ManualClock;
    use crate::data::storage::MemoryStorage;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(24 * 3600);

    fn setup() -> (SnapshotStore, MemoryStorage, ManualClock) {
        let storage = MemoryStorage::new();
        let clock = ManualClock::default();
        let store = SnapshotStore::new(Arc::new(storage.clone()), TTL, Arc::new(clock.clone()));
        (store, storage, clock)
    }

    fn entries(clock: &ManualClock, n: usize) -> Vec<(CacheKey, CacheEntry)> {
        (0..n)
            .map(|i| {
                (
                    build_key("loan", &format!("d{i}")),
                    CacheEntry::new(json!({"payment": i}), clock.now()),
                )
            })
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_entries_and_order() {
        let (store, _, clock) = setup();
        let saved = entries(&clock, 3);
        assert!(store.save("loan", saved.iter().map(|(k, e)| (k, e))));

        let loaded = store.load("loan");
        let loaded: Vec<(CacheKey, CacheEntry)> = loaded.into_iter().collect();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_load_missing_slot_is_empty() {
        let (store, _, _) = setup();
        assert!(store.load("loan").is_empty());
    }

    #[test]
    fn test_load_corrupt_snapshot_is_empty() {
        let (store, storage, _) = setup();
        storage.set(&slot_name("loan"), "{not json").unwrap();
        assert!(store.load("loan").is_empty());
    }

    #[test]
    fn test_load_discards_expired_entries() {
        let (store, _, clock) = setup();
        let old = entries(&clock, 2);
        clock.advance(Duration::from_secs(3600));
        let mut all = old;
        all.push((
            build_key("loan", "fresh"),
            CacheEntry::new(json!("fresh"), clock.now()),
        ));
        store.save("loan", all.iter().map(|(k, e)| (k, e)));

        clock.advance(TTL - Duration::from_secs(1800));
        let loaded = store.load("loan");
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&build_key("loan", "fresh")));
    }

    #[test]
    fn test_load_ignores_other_schema() {
        let (store, storage, clock) = setup();
        let snapshot = json!({
            "schema": "v0",
            "namespace": "loan",
            "saved_at": clock.now(),
            "entries": [{"key": "loan:abc", "value": 1, "created_at": clock.now()}]
        });
        storage
            .set(&slot_name("loan"), &snapshot.to_string())
            .unwrap();
        assert!(store.load("loan").is_empty());
    }

    #[test]
    fn test_load_skips_foreign_namespace_keys() {
        let (store, storage, clock) = setup();
        let snapshot = json!({
            "schema": SCHEMA_VERSION,
            "namespace": "loan",
            "saved_at": clock.now(),
            "entries": [
                {"key": "loan:abc", "value": 1, "created_at": clock.now()},
                {"key": "savings:abc", "value": 2, "created_at": clock.now()}
            ]
        });
        storage
            .set(&slot_name("loan"), &snapshot.to_string())
            .unwrap();
        let loaded = store.load("loan");
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&build_key("loan", "abc")));
    }

    #[test]
    fn test_round_trip_namespace_with_separator() {
        let (store, _, clock) = setup();
        let key = build_key("fin:loan", "d0");
        let entry = CacheEntry::new(json!({"payment": 1}), clock.now());
        store.save("fin:loan", [(&key, &entry)]);

        let loaded = store.load("fin:loan");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&key), Some(&entry));
        assert!(store.load("fin").is_empty());
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let clock = ManualClock::default();
        let storage = MemoryStorage::with_quota(16);
        let store = SnapshotStore::new(Arc::new(storage.clone()), TTL, Arc::new(clock.clone()));

        let saved = entries(&clock, 5);
        assert!(!store.save("loan", saved.iter().map(|(k, e)| (k, e))));
        assert!(storage.get(&slot_name("loan")).unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let (store, _, clock) = setup();
        let first = entries(&clock, 3);
        store.save("loan", first.iter().map(|(k, e)| (k, e)));
        store.save("loan", first[..1].iter().map(|(k, e)| (k, e)));
        assert_eq!(store.load("loan").len(), 1);
    }

    #[test]
    fn test_remove() {
        let (store, storage, clock) = setup();
        let saved = entries(&clock, 1);
        store.save("loan", saved.iter().map(|(k, e)| (k, e)));
        assert!(store.remove("loan"));
        assert!(storage.get(&slot_name("loan")).unwrap().is_none());
    }

    #[test]
    fn test_slot_name() {
        assert_eq!(slot_name("mortgage"), "calccache:mortgage");
    }
}
