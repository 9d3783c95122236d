//! 配置结构

use crate::api::error::ConfigError;
use crate::config::defaults;
use crate::device::{AcceleratorKind, NpuRuntime};
use crate::tensor::ElementEncoding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 主配置结构
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// 运行时
    pub runtime: RuntimeConfig,
    /// 张量绑定
    pub binding: BindingConfig,
    /// NPU 构建选项
    pub npu: NpuConfig,
    /// 日志
    pub logging: LoggingConfig,
}

/// 运行时配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 加速器类型
    pub accelerator: AcceleratorKind,
    /// 为空时使用 CPU 核数
    pub num_threads: Option<usize>,
    /// SDK 库搜索目录，为空时不在创建上下文时加载
    pub library_paths: Vec<PathBuf>,
    /// 共享工作区槽位数
    pub workspace_slots: usize,
}

/// 张量绑定配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BindingConfig {
    /// 张量元素编码
    pub encoding: ElementEncoding,
}

/// NPU 构建选项
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NpuConfig {
    /// 首选运行时
    pub runtime: NpuRuntime,
    /// 运行时回退顺序
    pub runtime_order: Vec<NpuRuntime>,
    /// 是否使用调用方提供的缓冲区
    pub use_user_supplied_buffers: bool,
    /// 是否启用初始化缓存
    pub use_init_cache: bool,
    /// 平台选项字符串，原样传给 SDK
    pub platform_options: String,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 日志格式
    pub format: String,
    /// 输出目标（stdout / stderr / 文件路径）
    pub output: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            accelerator: defaults::DEFAULT_ACCELERATOR,
            num_threads: None,
            library_paths: Vec::new(),
            workspace_slots: defaults::DEFAULT_WORKSPACE_SLOTS,
        }
    }
}

impl RuntimeConfig {
    /// 实际线程数：未配置时取 CPU 核数
    pub fn resolved_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }
}

impl Default for NpuConfig {
    fn default() -> Self {
        Self {
            runtime: defaults::DEFAULT_NPU_RUNTIME,
            runtime_order: Vec::new(),
            use_user_supplied_buffers: defaults::DEFAULT_USE_USER_SUPPLIED_BUFFERS,
            use_init_cache: defaults::DEFAULT_USE_INIT_CACHE,
            platform_options: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            format: defaults::DEFAULT_LOG_FORMAT.to_string(),
            output: vec![defaults::DEFAULT_LOG_OUTPUT.to_string()],
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &str) -> crate::Result<Self> {
        crate::config::loader::load_from_file(path)
    }

    /// 从环境变量加载配置
    pub fn from_env() -> crate::Result<Self> {
        crate::config::loader::load_from_env()
    }

    /// 检查取值范围
    pub fn validate(&self) -> crate::Result<()> {
        if self.runtime.num_threads == Some(0) {
            return Err(ConfigError::Invalid("runtime.num_threads must be positive".to_string()).into());
        }
        if self.runtime.workspace_slots == 0 {
            return Err(ConfigError::Invalid("runtime.workspace_slots must be positive".to_string()).into());
        }
        Ok(())
    }
}
