//! NPU 执行上下文

use crate::config::settings::NpuConfig;
use crate::device::context::{AcceleratorKind, ContextCore, ExecutionContext};
use crate::device::library::SdkEnvironment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// NPU SDK 库候选名
pub const NPU_LIBRARY_CANDIDATES: &[&str] = &["libSNPE.so", "SNPE.dll"];

/// NPU SDK 可选的执行单元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpuRuntime {
    /// SoC 上的 CPU
    Cpu,
    /// SoC 上的 GPU
    Gpu,
    /// Hexagon DSP
    #[default]
    Dsp,
    /// AI 处理器（HTA + DSP）
    Aip,
}

impl fmt::Display for NpuRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NpuRuntime::Cpu => write!(f, "cpu"),
            NpuRuntime::Gpu => write!(f, "gpu"),
            NpuRuntime::Dsp => write!(f, "dsp"),
            NpuRuntime::Aip => write!(f, "aip"),
        }
    }
}

/// 构建网络时传给 SDK 的选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpuBuildOptions {
    /// 首选执行单元
    pub runtime: NpuRuntime,
    /// 执行单元优先级，已解析：永不为空
    pub runtime_order: Vec<NpuRuntime>,
    /// 是否使用调用方提供的缓冲区
    pub use_user_supplied_buffers: bool,
    /// 是否启用初始化缓存
    pub use_init_cache: bool,
    /// 平台选项字符串
    pub platform_options: String,
}

impl NpuBuildOptions {
    /// 配置中的优先级列表为空时只使用 `runtime`
    pub fn from_config(config: &NpuConfig) -> Self {
        let runtime_order = if config.runtime_order.is_empty() {
            vec![config.runtime]
        } else {
            config.runtime_order.clone()
        };
        Self {
            runtime: config.runtime,
            runtime_order,
            use_user_supplied_buffers: config.use_user_supplied_buffers,
            use_init_cache: config.use_init_cache,
            platform_options: config.platform_options.clone(),
        }
    }
}

impl Default for NpuBuildOptions {
    fn default() -> Self {
        Self::from_config(&NpuConfig::default())
    }
}

/// NPU 上下文
#[derive(Debug)]
pub struct NpuContext {
    core: ContextCore,
    options: NpuBuildOptions,
}

impl NpuContext {
    /// 创建未绑定设备的 NPU 上下文
    pub fn new(env: Arc<SdkEnvironment>, workspace_slots: usize, options: NpuBuildOptions) -> Self {
        tracing::debug!(
            "NPU build options: runtime order {:?}, user buffers {}",
            options.runtime_order,
            options.use_user_supplied_buffers
        );
        Self {
            core: ContextCore::new(AcceleratorKind::Npu, env, workspace_slots),
            options,
        }
    }

    /// 构建选项
    pub fn build_options(&self) -> &NpuBuildOptions {
        &self.options
    }
}

impl ExecutionContext for NpuContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContextCore {
        &mut self.core
    }

    fn library_candidates(&self) -> &'static [&'static str] {
        NPU_LIBRARY_CANDIDATES
    }
}
