// lib.rs - 计算结果缓存库，供 CLI 和计算器界面共用

pub mod core;
pub mod data;
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;

pub use core::{init_logger, update_log_level};
pub use data::{CacheError, CacheManager, CacheOutcome, CacheStats, KeyPreview};
pub use services::{Calculator, CalculatorError, HttpCalculator};
