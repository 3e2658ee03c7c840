//! 计算结果缓存模块
//!
//! 为计算器工具提供确定性、规范化、有界、可持久化的结果缓存。
//!
//! # 模块组织
//!
//! - `error`: 统一错误类型定义
//! - `cache`: 缓存层实现（规范化 + 摘要 + 有界存储 + 快照）
//! - `storage`: 持久化存储后端（文件 / 内存）
//! - `manager`: 统一入口 `CacheManager`
//!
//! # 使用示例
//!
//! ```rust
//! use crate::data::CacheManager;
//! use crate::models::{CacheContext, CalculatorTool, InputRecord, LocaleBundle};
//!
//! let manager = CacheManager::from_config(&config)?;
//! let context = CacheContext::for_tool(&CalculatorTool::loan(), LocaleBundle::default());
//! let input = InputRecord::new().with("amount", "$1,000").with("rate", "5.5");
//!
//! // 调试：查看缓存键
//! let preview = manager.preview_key(&input, &context);
//! ```

pub mod cache;
pub mod error;
pub mod manager;
pub mod storage;

pub use error::{CacheError, Result};
pub use manager::{CacheManager, CacheOutcome, CacheStats, EntryStats, KeyPreview};
