use crate::models::config::{LogConfig, LogFormat, LogLevel, LogOutput};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Subscriber;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 级别热重载句柄，`init_logger` 成功后设置
static LOG_LEVEL_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// 初始化日志系统
///
/// 级别、格式（文本/JSON）、输出目标（控制台/文件/两者）均来自配置。
/// 控制台输出写到 stderr，stdout 留给命令结果。
///
/// 日志级别可以通过 `update_log_level` 动态调整，其余配置需要重新启动进程。
///
/// # 示例
/// ```
/// use calccache::models::config::LogConfig;
/// use calccache::core::init_logger;
///
/// init_logger(&LogConfig::default()).expect("初始化日志系统失败");
/// ```
pub fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    let (filter_layer, reload_handle) = reload::Layer::new(create_env_filter(&config.level));
    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    let (to_console, to_file) = output_targets(config.output);

    let console_layer = to_console.then(|| output_layer(config.format, std::io::stderr, true));
    let file_layer = if to_file {
        let (writer, guard) = non_blocking(create_file_appender(config.file_path.as_deref())?);
        // 后台写线程随 guard 释放而停止，需存活到进程结束
        Box::leak(Box::new(guard));
        Some(output_layer(config.format, writer, false))
    } else {
        None
    };

    Registry::default()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("注册全局日志订阅器失败")?;

    tracing::info!(
        level = config.level.as_str(),
        format = ?config.format,
        output = ?config.output,
        file_path = ?config.file_path,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 输出目标拆分为 (控制台, 文件)
fn output_targets(output: LogOutput) -> (bool, bool) {
    match output {
        LogOutput::Console => (true, false),
        LogOutput::File => (false, true),
        LogOutput::Both => (true, true),
    }
}

/// 按格式构建输出层
///
/// JSON 始终带 target，便于检索；文本格式只在调试构建中显示 target。
fn output_layer<S, W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_thread_ids(false);

    match format {
        LogFormat::Text => layer.with_target(cfg!(debug_assertions)).boxed(),
        LogFormat::Json => layer.json().with_target(true).boxed(),
    }
}

/// 默认过滤指令：本 crate 使用指定级别，HTTP 相关依赖只输出 WARN
fn default_directives(level: &LogLevel) -> String {
    format!(
        "calccache={},hyper=warn,reqwest=warn,h2=warn",
        level.as_str()
    )
}

/// 创建环境过滤器（RUST_LOG 优先）
fn create_env_filter(level: &LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// 按天滚动的日志文件（文件名前缀 `calccache`）
fn create_file_appender(file_path: Option<&str>) -> anyhow::Result<rolling::RollingFileAppender> {
    let log_dir = get_log_dir(file_path)?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("创建日志目录失败: {}", log_dir.display()))?;
    Ok(rolling::daily(log_dir, "calccache"))
}

/// 获取日志目录（未配置时为 ~/.calccache/logs）
fn get_log_dir(file_path: Option<&str>) -> anyhow::Result<PathBuf> {
    match file_path {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(crate::utils::config::config_dir()?.join("logs")),
    }
}

/// 动态更新日志级别（热重载）
///
/// 仅调整级别，格式和输出目标的变更仍需重启。
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    handle
        .reload(create_env_filter(&new_level))
        .context("重载日志级别失败")?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives(&LogLevel::Debug),
            "calccache=debug,hyper=warn,reqwest=warn,h2=warn"
        );
    }

    #[test]
    fn test_get_log_dir_explicit_path() {
        let dir = get_log_dir(Some("/var/log/calccache")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/calccache"));
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let temp = TempDir::new().unwrap();
        let log_dir = temp.path().join("nested").join("logs");
        let appender = create_file_appender(log_dir.to_str());
        assert!(appender.is_ok());
        assert!(log_dir.is_dir());
    }

    #[test]
    fn test_output_targets() {
        assert_eq!(output_targets(LogOutput::Console), (true, false));
        assert_eq!(output_targets(LogOutput::File), (false, true));
        assert_eq!(output_targets(LogOutput::Both), (true, true));
    }

    #[test]
    fn test_output_layer_for_each_format() {
        for format in [LogFormat::Text, LogFormat::Json] {
            let layer: BoxedLayer<Registry> = output_layer(format, std::io::sink, false);
            let subscriber = Registry::default().with(layer);
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(format = ?format, "写入空输出");
            });
        }
    }

    #[test]
    fn test_update_before_init_fails() {
        if LOG_LEVEL_HANDLE.get().is_none() {
            assert!(update_log_level(LogLevel::Warn).is_err());
        }
    }
}
