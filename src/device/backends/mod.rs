//! 加速器后端

pub mod cpu;
pub mod gpu;
pub mod npu;

use crate::config::settings::{NpuConfig, RuntimeConfig};
use crate::device::context::{AcceleratorKind, ExecutionContext};
use crate::device::library::SdkEnvironment;
use crate::Result;
use std::sync::Arc;

pub use cpu::CpuContext;
pub use gpu::GpuContext;
pub use npu::{NpuBuildOptions, NpuContext, NpuRuntime};

/// 按配置创建执行上下文
///
/// 配置了库路径时立即加载 SDK 库，加载失败直接返回错误。
/// 返回的上下文尚未绑定设备（CPU 除外，它自带进程内设备）。
pub fn create_context(
    runtime: &RuntimeConfig,
    env: Arc<SdkEnvironment>,
    npu: &NpuConfig,
) -> Result<Box<dyn ExecutionContext>> {
    let slots = runtime.workspace_slots;
    let mut ctx: Box<dyn ExecutionContext> = match runtime.accelerator {
        AcceleratorKind::Gpu => Box::new(GpuContext::new(env, slots)),
        AcceleratorKind::Npu => Box::new(NpuContext::new(env, slots, NpuBuildOptions::from_config(npu))),
        AcceleratorKind::Cpu => Box::new(CpuContext::with_host_device(env, slots)?),
    };

    let threads = runtime.resolved_num_threads();
    ctx.set_num_threads(i64::try_from(threads).unwrap_or(i64::MAX))?;

    if !runtime.library_paths.is_empty() {
        ctx.load_library(&runtime.library_paths)?;
    }

    tracing::info!(
        "Created {} execution context ({} threads, {} workspace slots)",
        runtime.accelerator,
        threads,
        slots
    );
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorKind;
    use crate::device::context::ContextState;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_create_cpu_context() {
        let runtime = RuntimeConfig {
            accelerator: AcceleratorKind::Cpu,
            num_threads: Some(2),
            ..RuntimeConfig::default()
        };
        let ctx = create_context(&runtime, Arc::new(SdkEnvironment::new()), &NpuConfig::default()).unwrap();
        assert_eq!(ctx.accelerator(), AcceleratorKind::Cpu);
        assert_eq!(ctx.state(), ContextState::Ready);
        assert_eq!(ctx.num_threads(), 2);
    }

    #[test]
    fn test_create_gpu_context_unbound() {
        let runtime = RuntimeConfig {
            accelerator: AcceleratorKind::Gpu,
            ..RuntimeConfig::default()
        };
        let ctx = create_context(&runtime, Arc::new(SdkEnvironment::new()), &NpuConfig::default()).unwrap();
        assert_eq!(ctx.state(), ContextState::Created);
        assert_eq!(ctx.num_threads(), num_cpus::get());
    }

    #[test]
    fn test_create_npu_context_missing_library() {
        let dir = TempDir::new().unwrap();
        let runtime = RuntimeConfig {
            accelerator: AcceleratorKind::Npu,
            library_paths: vec![PathBuf::from(dir.path())],
            ..RuntimeConfig::default()
        };
        let err = create_context(&runtime, Arc::new(SdkEnvironment::new()), &NpuConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryLoad);
    }
}
