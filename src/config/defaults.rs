//! 默认配置常量

use crate::device::{AcceleratorKind, NpuRuntime};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "ACCELBIND";
/// 环境变量层级分隔符
pub const ENV_SEPARATOR: &str = "__";

/// 默认加速器
pub const DEFAULT_ACCELERATOR: AcceleratorKind = AcceleratorKind::Cpu;
/// 默认工作区槽位数
pub const DEFAULT_WORKSPACE_SLOTS: usize = 4;

/// NPU 首选运行时
pub const DEFAULT_NPU_RUNTIME: NpuRuntime = NpuRuntime::Dsp;
/// 是否使用调用方提供的缓冲区
pub const DEFAULT_USE_USER_SUPPLIED_BUFFERS: bool = true;
/// 是否启用初始化缓存
pub const DEFAULT_USE_INIT_CACHE: bool = false;

/// 默认日志级别
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// 默认日志格式（compact / pretty / json）
pub const DEFAULT_LOG_FORMAT: &str = "compact";
/// 默认日志输出
pub const DEFAULT_LOG_OUTPUT: &str = "stderr";
