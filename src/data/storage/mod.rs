//! 持久化存储后端
//!
//! 文本键值接口，每个命名空间占用一个槽位：
//! - `file`: 目录下每个槽位一个 JSON 文件
//! - `memory`: 进程内映射，可设置容量上限模拟宿主存储配额
//!
//! 存储层没有任何锁保护跨进程写入，多个写入方之间后写者胜出。

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::data::Result;
use std::fmt;

/// 持久化存储接口
pub trait DurableStorage: Send + Sync + fmt::Debug {
    /// 读取槽位内容，不存在时返回 `Ok(None)`
    fn get(&self, slot: &str) -> Result<Option<String>>;

    /// 整体覆盖槽位内容
    fn set(&self, slot: &str, contents: &str) -> Result<()>;

    /// 删除槽位，不存在时视为成功
    fn remove(&self, slot: &str) -> Result<()>;
}
