//! 内存存储后端
//!
//! 进程内共享的槽位映射。可选的 `quota` 限制所有槽位的总字节数，
//! 超出时写入返回 `QuotaExceeded`，用于模拟宿主环境的存储上限。

use super::DurableStorage;
use crate::data::{CacheError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带总字节上限的存储
    pub fn with_quota(quota: usize) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            quota: Some(quota),
        }
    }

    /// 当前所有槽位占用的字节数
    pub fn used_bytes(&self) -> usize {
        self.slots
            .read()
            .map(|slots| slots.values().map(String::len).sum())
            .unwrap_or(0)
    }

    pub fn slot_names(&self) -> Vec<String> {
        self.slots
            .read()
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        let slots = self
            .slots
            .read()
            .map_err(|e| CacheError::Concurrency(e.to_string()))?;
        Ok(slots.get(slot).cloned())
    }

    fn set(&self, slot: &str, contents: &str) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|e| CacheError::Concurrency(e.to_string()))?;

        if let Some(quota) = self.quota {
            // 覆盖写入时旧内容会被释放，不计入占用
            let used: usize = slots
                .iter()
                .filter(|(name, _)| name.as_str() != slot)
                .map(|(_, value)| value.len())
                .sum();
            let available = quota.saturating_sub(used);
            if contents.len() > available {
                return Err(CacheError::QuotaExceeded {
                    slot: slot.to_string(),
                    required: contents.len(),
                    available,
                });
            }
        }

        slots.insert(slot.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|e| CacheError::Concurrency(e.to_string()))?;
        slots.remove(slot);
        Ok(())
    }
}
