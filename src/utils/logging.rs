//! 日志初始化
//!
//! 库代码只发出 `tracing` 事件，由宿主程序决定是否安装 subscriber。
//! 这里提供基于 `tracing-subscriber` 的便捷初始化：
//! - `RUST_LOG` 优先于配置中的级别
//! - 格式：json / pretty / compact
//! - 输出：stdout、stderr 或追加写入的文件

use crate::api::error::ConfigError;
use crate::config::settings::LoggingConfig;
use crate::Result;
use std::path::Path;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 初始化日志系统
///
/// 只使用第一个输出目标；进程内只能成功初始化一次，重复调用返回 `ConfigError`。
///
/// ```no_run
/// use accelbind::config::LoggingConfig;
/// use accelbind::utils::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "accelbind=debug".to_string(),
///     format: "json".to_string(),
///     output: vec!["logs/accelbind.log".to_string()],
/// };
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| {
            // subscriber 尚未安装，只能写 stderr
            eprintln!("Warning: Invalid log level '{}', using 'info'", config.level);
            EnvFilter::new("info")
        })
    });

    let output = primary_output(&config.output);
    install(&config.format, filter, output)?;

    tracing::info!(
        "Logging initialized: level={}, format={}, output={}",
        config.level,
        config.format,
        output
    );
    Ok(())
}

/// 使用默认配置初始化：info 级别，compact 格式，输出到 stderr
pub fn init_default_logging() -> Result<()> {
    init_logging(&LoggingConfig::default())
}

/// 从环境变量初始化日志系统
///
/// - `RUST_LOG`: 级别过滤，例如 `RUST_LOG=warn,accelbind=debug`
/// - `RUST_LOG_FORMAT`: `json` / `pretty` / `compact`
/// - `RUST_LOG_OUTPUT`: 逗号分隔的输出目标，只使用第一个
pub fn init_logging_from_env() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let outputs: Vec<String> = std::env::var("RUST_LOG_OUTPUT")
        .map(|s| parse_outputs(&s))
        .unwrap_or_default();

    install(&format, filter, primary_output(&outputs))
}

fn parse_outputs(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn primary_output(outputs: &[String]) -> &str {
    if outputs.len() > 1 {
        eprintln!(
            "Warning: Multiple log outputs specified, only '{}' will be used",
            outputs[0]
        );
    }
    outputs.first().map(String::as_str).unwrap_or("stderr")
}

fn install(format: &str, filter: EnvFilter, output: &str) -> Result<()> {
    match output {
        "stdout" => init_subscriber(format, filter, std::io::stdout),
        "stderr" => init_subscriber(format, filter, std::io::stderr),
        file_path => {
            let file = open_log_file(Path::new(file_path))?;
            init_subscriber(format, filter, file)
        }
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create log directory: {}", e)))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to open log file {}: {}", path.display(), e)))?;
    Ok(file)
}

fn init_subscriber<W>(format: &str, filter: EnvFilter, writer: W) -> Result<()>
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = match format.to_lowercase().as_str() {
        "json" => fmt::layer()
            .with_writer(writer)
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .boxed(),
        "pretty" | "human" => fmt::layer()
            .with_writer(writer)
            .pretty()
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
        _ => fmt::layer()
            .with_writer(writer)
            .compact()
            .with_target(true)
            .boxed(),
    };

    Registry::default()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("Failed to initialize logging: {}", e)))?;
    Ok(())
}
