//! 核心基础设施
//!
//! - `logger`: 基于 tracing 的日志系统（支持级别热重载）
//! - `http`: 远程计算端点使用的 HTTP 客户端

pub mod http;
pub mod logger;

pub use http::build_http_client;
pub use logger::{init_logger, update_log_level};
