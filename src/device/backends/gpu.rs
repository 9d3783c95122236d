//! GPU 执行上下文

use crate::device::context::{AcceleratorKind, ContextCore, ExecutionContext};
use crate::device::library::SdkEnvironment;
use crate::Result;
use std::sync::Arc;

/// GPU 驱动库候选名
pub const GPU_LIBRARY_CANDIDATES: &[&str] = &[
    "libcuda.so.1",
    "libcuda.so",
    "nvcuda.dll",
    "libcuda.dylib",
    "d3d11.dll",
];

/// GPU 上下文
///
/// 前向推理结束时提交命令队列，让设备尽早开始执行已录制的工作。
#[derive(Debug)]
pub struct GpuContext {
    core: ContextCore,
}

impl GpuContext {
    /// 创建未绑定设备的 GPU 上下文
    pub fn new(env: Arc<SdkEnvironment>, workspace_slots: usize) -> Self {
        Self {
            core: ContextCore::new(AcceleratorKind::Gpu, env, workspace_slots),
        }
    }
}

impl ExecutionContext for GpuContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContextCore {
        &mut self.core
    }

    fn library_candidates(&self) -> &'static [&'static str] {
        GPU_LIBRARY_CANDIDATES
    }

    fn on_instance_forward_end(&mut self) -> Result<()> {
        self.core.forward_end()?;
        self.core.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorKind;
    use crate::device::context::ContextState;
    use crate::device::handle::{CommandQueue, DeviceFault, HostDevice};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingQueue {
        flushes: AtomicUsize,
        broken: AtomicBool,
    }

    impl CommandQueue for CountingQueue {
        fn flush(&self) -> std::result::Result<(), DeviceFault> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(DeviceFault("TDR".to_string()));
            }
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn wait_idle(&self) -> std::result::Result<(), DeviceFault> {
            Ok(())
        }
    }

    fn ready() -> (GpuContext, Arc<CountingQueue>) {
        let mut ctx = GpuContext::new(Arc::new(SdkEnvironment::new()), 2);
        let queue = Arc::new(CountingQueue::default());
        ctx.set_device(Arc::new(HostDevice::new("cuda:0"))).unwrap();
        ctx.set_command_queue(queue.clone()).unwrap();
        (ctx, queue)
    }

    #[test]
    fn test_forward_end_flushes_queue() {
        let (mut ctx, queue) = ready();
        ctx.on_instance_forward_begin().unwrap();
        ctx.on_instance_forward_end().unwrap();
        assert_eq!(queue.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.state(), ContextState::Ready);
    }

    #[test]
    fn test_flush_fault_loses_device() {
        let (mut ctx, queue) = ready();
        queue.broken.store(true, Ordering::SeqCst);
        ctx.on_instance_forward_begin().unwrap();
        let err = ctx.on_instance_forward_end().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceLost);
        assert_eq!(ctx.state(), ContextState::Lost);
    }

    #[test]
    fn test_candidates() {
        let ctx = GpuContext::new(Arc::new(SdkEnvironment::new()), 1);
        assert_eq!(ctx.accelerator(), AcceleratorKind::Gpu);
        assert!(ctx.library_candidates().contains(&"libcuda.so.1"));
    }
}
