//! 缓存统一入口
//!
//! `CacheManager` 是调用方使用的读穿/写穿门面：
//! 规范化输入 → 计算缓存键 → 查询 → 未命中时调用外部计算 → 写入 → 刷新快照。
//!
//! - 按命名空间懒加载存储（首次访问时从快照恢复）
//! - 命中时不会调用计算函数
//! - 计算失败原样返回，且永不缓存
//! - 可选的单飞模式：相同键的并发请求共享一次计算
//!
//! # 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use crate::data::CacheManager;
//! use crate::data::storage::FileStorage;
//!
//! let manager = CacheManager::new(CacheSettings::default(), Arc::new(FileStorage::new(dir)))?;
//! let outcome = manager
//!     .get_or_compute(&input, &context, |canonical| async move { calculator.compute("loan", &canonical).await })
//!     .await?;
//! if outcome.from_cache {
//!     println!("结果来自缓存");
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::data::cache::{
    build_key, digest, BoundedStore, CacheKey, CanonicalRecord, Clock, EvictionPolicy,
    Normalizer, SnapshotStore, SystemClock,
};
use crate::data::storage::{DurableStorage, FileStorage};
use crate::data::Result;
use crate::models::{AppConfig, CacheContext, CacheSettings, CalculatorTool, InputRecord, ResultRecord};
use crate::services::calculator::{Calculator, CalculatorError};

/// 一次查询的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheOutcome {
    pub key: CacheKey,
    pub value: ResultRecord,
    /// 是否由缓存提供（可用于“结果来自缓存”提示）
    pub from_cache: bool,
}

/// 调试用：缓存键及其规范记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyPreview {
    pub key: CacheKey,
    pub canonical: CanonicalRecord,
}

/// 单个条目的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryStats {
    pub key: CacheKey,
    pub created_at: DateTime<Utc>,
    pub age_secs: u64,
    pub expired: bool,
}

/// 命名空间统计（只读，无副作用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub namespace: String,
    pub entries: usize,
    pub capacity: usize,
    pub ttl_hours: u64,
    pub eviction: EvictionPolicy,
    /// 按淘汰顺序排列，第一个最先被淘汰
    pub items: Vec<EntryStats>,
}

/// 单个命名空间的缓存
#[derive(Debug)]
struct NamespaceCache {
    normalizer: Normalizer,
    store: Mutex<BoundedStore>,
}

impl NamespaceCache {
    fn get(&self, key: &CacheKey) -> Option<ResultRecord> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        store.get(key).cloned()
    }
}

type InflightMap = HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>;

/// 单飞占位，离开作用域时清理登记
struct InflightGuard<'a> {
    inflight: &'a Mutex<InflightMap>,
    key: CacheKey,
    lock: Arc<tokio::sync::Mutex<()>>,
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // 登记表 + 本占位 + 持有的锁守卫，没有其他等待者时移除
        if Arc::strong_count(&self.lock) <= 3 {
            inflight.remove(&self.key);
        }
    }
}

/// 计算结果缓存管理器
pub struct CacheManager {
    settings: CacheSettings,
    clock: Arc<dyn Clock>,
    snapshots: SnapshotStore,
    tools: HashMap<String, CalculatorTool>,
    namespaces: RwLock<HashMap<String, Arc<NamespaceCache>>>,
    inflight: Mutex<InflightMap>,
}

impl CacheManager {
    /// 使用系统时钟创建管理器
    pub fn new(settings: CacheSettings, storage: Arc<dyn DurableStorage>) -> Result<Self> {
        Self::with_clock(settings, storage, Arc::new(SystemClock))
    }

    /// 使用指定时钟创建管理器
    pub fn with_clock(
        settings: CacheSettings,
        storage: Arc<dyn DurableStorage>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        settings.validate()?;

        let snapshots = SnapshotStore::new(storage, settings.ttl(), Arc::clone(&clock));
        let tools = CalculatorTool::all()
            .into_iter()
            .map(|tool| (tool.id.clone(), tool))
            .collect();

        Ok(Self {
            settings,
            clock,
            snapshots,
            tools,
            namespaces: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        })
    }

    /// 根据应用配置创建（文件存储）
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let dir = match &config.cache.storage_dir {
            Some(dir) => dir.clone(),
            None => crate::utils::config::default_cache_dir()?,
        };
        tracing::debug!(storage_dir = ?dir, "使用文件缓存存储");
        Self::new(config.cache.clone(), Arc::new(FileStorage::new(dir)))
    }

    /// 登记额外的计算器工具（决定其数值字段列表）
    ///
    /// 需在该命名空间首次使用前调用。
    pub fn with_tool(mut self, tool: CalculatorTool) -> Self {
        self.tools.insert(tool.id.clone(), tool);
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// 获取或创建命名空间缓存（首次创建时从快照恢复）
    fn namespace(&self, namespace: &str) -> Arc<NamespaceCache> {
        {
            let namespaces = self.namespaces.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cache) = namespaces.get(namespace) {
                return Arc::clone(cache);
            }
        }

        let mut namespaces = self.namespaces.write().unwrap_or_else(PoisonError::into_inner);

        // 双重检查（避免并发创建）
        if let Some(cache) = namespaces.get(namespace) {
            return Arc::clone(cache);
        }

        let tool = self
            .tools
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| CalculatorTool::generic(namespace));

        let mut store = BoundedStore::new(
            self.settings.max_entries,
            self.settings.ttl(),
            self.settings.eviction,
            Arc::clone(&self.clock),
        );
        store.restore(self.snapshots.load(namespace));

        tracing::debug!(namespace = %namespace, restored = store.len(), "命名空间缓存已创建");

        let cache = Arc::new(NamespaceCache {
            normalizer: Normalizer::for_tool(&tool),
            store: Mutex::new(store),
        });
        namespaces.insert(namespace.to_string(), Arc::clone(&cache));
        cache
    }

    fn canonicalize(
        &self,
        cache: &NamespaceCache,
        input: &InputRecord,
        context: &CacheContext,
    ) -> KeyPreview {
        let canonical = cache.normalizer.normalize(input, context);
        let key = build_key(&context.namespace, &digest(&canonical, self.settings.digest));
        KeyPreview { key, canonical }
    }

    /// 计算缓存键和规范记录，不做查询
    pub fn preview_key(&self, input: &InputRecord, context: &CacheContext) -> KeyPreview {
        let cache = self.namespace(&context.namespace);
        self.canonicalize(&cache, input, context)
    }

    /// 只查询缓存，不触发计算
    pub fn lookup(&self, input: &InputRecord, context: &CacheContext) -> Option<ResultRecord> {
        let cache = self.namespace(&context.namespace);
        let preview = self.canonicalize(&cache, input, context);
        cache.get(&preview.key)
    }

    /// 读穿缓存
    ///
    /// 命中时直接返回；未命中时调用 `compute`，成功则写入缓存并刷新快照。
    /// `compute` 的失败原样返回，不写入缓存，也不重试。
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        input: &InputRecord,
        context: &CacheContext,
        compute: F,
    ) -> std::result::Result<CacheOutcome, E>
    where
        F: FnOnce(CanonicalRecord) -> Fut,
        Fut: Future<Output = std::result::Result<ResultRecord, E>>,
    {
        let namespace = context.namespace.as_str();
        let cache = self.namespace(namespace);
        let KeyPreview { key, canonical } = self.canonicalize(&cache, input, context);

        if let Some(value) = cache.get(&key) {
            tracing::debug!(namespace = %namespace, key = %key, "缓存命中");
            return Ok(CacheOutcome {
                key,
                value,
                from_cache: true,
            });
        }

        let _inflight = if self.settings.single_flight {
            let guard = self.acquire_inflight(&key).await;
            // 等待期间可能已有其他调用写入
            if let Some(value) = cache.get(&key) {
                tracing::debug!(namespace = %namespace, key = %key, "等待并发计算后命中");
                return Ok(CacheOutcome {
                    key,
                    value,
                    from_cache: true,
                });
            }
            Some(guard)
        } else {
            None
        };

        tracing::debug!(namespace = %namespace, key = %key, "缓存未命中，执行计算");

        let value = match compute(canonical).await {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(namespace = %namespace, key = %key, "计算失败，不写入缓存");
                return Err(e);
            }
        };

        self.store_and_flush(&cache, namespace, key.clone(), value.clone());

        Ok(CacheOutcome {
            key,
            value,
            from_cache: false,
        })
    }

    /// 使用 `Calculator` 的读穿缓存
    pub async fn get_or_compute_with(
        &self,
        calculator: &dyn Calculator,
        input: &InputRecord,
        context: &CacheContext,
    ) -> std::result::Result<CacheOutcome, CalculatorError> {
        let tool = context.namespace.clone();
        self.get_or_compute(input, context, |canonical| async move {
            calculator.compute(&tool, &canonical).await
        })
        .await
    }

    /// 写入并整体刷新快照
    fn store_and_flush(
        &self,
        cache: &NamespaceCache,
        namespace: &str,
        key: CacheKey,
        value: ResultRecord,
    ) {
        let mut store = cache.store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(evicted) = store.put(key, value) {
            tracing::debug!(namespace = %namespace, evicted = %evicted, "容量已满，淘汰最早条目");
        }
        self.snapshots.save(namespace, store.entries());
    }

    async fn acquire_inflight(&self, key: &CacheKey) -> InflightGuard<'_> {
        let lock = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        InflightGuard {
            inflight: &self.inflight,
            key: key.clone(),
            lock,
            _guard: guard,
        }
    }

    /// 命名空间统计
    pub fn stats(&self, namespace: &str) -> CacheStats {
        let cache = self.namespace(namespace);
        let store = cache.store.lock().unwrap_or_else(PoisonError::into_inner);
        let now = store.now();
        let items = store
            .entries()
            .map(|(key, entry)| EntryStats {
                key: key.clone(),
                created_at: entry.created_at,
                age_secs: entry.age(now).as_secs(),
                expired: entry.is_expired(now, store.ttl()),
            })
            .collect();

        CacheStats {
            namespace: namespace.to_string(),
            entries: store.len(),
            capacity: store.capacity(),
            ttl_hours: self.settings.ttl_hours,
            eviction: store.policy(),
            items,
        }
    }

    /// 清空命名空间（内存 + 快照）
    pub fn clear(&self, namespace: &str) {
        let cache = self.namespace(namespace);
        cache
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.snapshots.remove(namespace);
        tracing::info!(namespace = %namespace, "缓存已清空");
    }

    /// 清空所有已知命名空间
    pub fn clear_all(&self) {
        let mut namespaces: Vec<String> = self
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        namespaces.extend(self.tools.keys().cloned());
        namespaces.sort();
        namespaces.dedup();

        for namespace in namespaces {
            self.clear(&namespace);
        }
    }
}
