//! CPU 回退上下文

use crate::device::context::{AcceleratorKind, ContextCore, ExecutionContext};
use crate::device::handle::{HostDevice, HostQueue};
use crate::device::library::SdkEnvironment;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// CPU 上下文，不依赖任何 SDK 库
#[derive(Debug)]
pub struct CpuContext {
    core: ContextCore,
}

impl CpuContext {
    /// 创建未绑定设备的 CPU 上下文
    pub fn new(env: Arc<SdkEnvironment>, workspace_slots: usize) -> Self {
        Self {
            core: ContextCore::new(AcceleratorKind::Cpu, env, workspace_slots),
        }
    }

    /// 绑定进程内设备和队列，返回的上下文直接处于 Ready 状态
    pub fn with_host_device(env: Arc<SdkEnvironment>, workspace_slots: usize) -> Result<Self> {
        let mut ctx = Self::new(env, workspace_slots);
        ctx.core.set_device(Arc::new(HostDevice::new("cpu")))?;
        ctx.core.set_command_queue(Arc::new(HostQueue::new()))?;
        Ok(ctx)
    }
}

impl ExecutionContext for CpuContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContextCore {
        &mut self.core
    }

    fn library_candidates(&self) -> &'static [&'static str] {
        &[]
    }

    fn load_library(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.core.skip_library_load(paths)
    }
}
