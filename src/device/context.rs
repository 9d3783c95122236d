//! 执行上下文
//!
//! 每个推理实例持有一个上下文，负责：
//! - 持有设备与命令队列句柄（与创建者共享所有权）
//! - 按需加载加速器 SDK 动态库
//! - 在前向推理前后执行约定的钩子，并提供同步点
//! - 提供跨前向推理复用的共享工作区
//!
//! 状态机：
//!
//! ```text
//! Created --set_device / set_command_queue--> DeviceBound --(两者都已设置)--> Ready
//! Ready --on_instance_forward_begin--> ForwardInFlight --on_instance_forward_end--> Ready
//! 任意状态 --release--> Released
//! synchronize 遇到设备故障 --> Lost
//! ```

use crate::api::error::ContextError;
use crate::device::handle::{CommandQueue, ComputeDevice};
use crate::device::library::SdkEnvironment;
use crate::device::profile::{ProfileResult, Profiler};
use crate::device::workspace::SharedWorkspace;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// 加速器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorKind {
    /// GPU（OpenCL / CUDA 类 SDK）
    Gpu,
    /// NPU / DSP
    Npu,
    /// CPU 回退路径，不需要外部 SDK
    #[default]
    Cpu,
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceleratorKind::Gpu => write!(f, "gpu"),
            AcceleratorKind::Npu => write!(f, "npu"),
            AcceleratorKind::Cpu => write!(f, "cpu"),
        }
    }
}

/// 上下文状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// 刚创建，尚未设置设备或队列
    Created,
    /// 设备与队列只设置了其中一个
    DeviceBound,
    /// 可以开始前向推理
    Ready,
    /// 处于 begin / end 之间
    ForwardInFlight,
    /// 已释放
    Released,
    /// 设备故障后不可再用，必须重建
    Lost,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextState::Created => "created",
            ContextState::DeviceBound => "device-bound",
            ContextState::Ready => "ready",
            ContextState::ForwardInFlight => "forward-in-flight",
            ContextState::Released => "released",
            ContextState::Lost => "lost",
        };
        write!(f, "{}", name)
    }
}

/// 各加速器变体共用的状态与规则
pub struct ContextCore {
    accelerator: AcceleratorKind,
    env: Arc<SdkEnvironment>,
    device: Option<Arc<dyn ComputeDevice>>,
    queue: Option<Arc<dyn CommandQueue>>,
    in_flight: bool,
    released: bool,
    lost: Option<String>,
    library_failure: Option<String>,
    num_threads: usize,
    workspace: SharedWorkspace,
    profiler: Profiler,
    forward_count: u64,
}

impl ContextCore {
    /// 创建未绑定的上下文，线程数默认取 CPU 核数
    pub fn new(accelerator: AcceleratorKind, env: Arc<SdkEnvironment>, workspace_slots: usize) -> Self {
        Self {
            accelerator,
            env,
            device: None,
            queue: None,
            in_flight: false,
            released: false,
            lost: None,
            library_failure: None,
            num_threads: num_cpus::get(),
            workspace: SharedWorkspace::new(workspace_slots),
            profiler: Profiler::new(),
            forward_count: 0,
        }
    }

    /// 加速器类型
    pub fn accelerator(&self) -> AcceleratorKind {
        self.accelerator
    }

    /// 由内部标志推导出的当前状态
    pub fn state(&self) -> ContextState {
        if self.released {
            return ContextState::Released;
        }
        if self.lost.is_some() {
            return ContextState::Lost;
        }
        if self.in_flight {
            return ContextState::ForwardInFlight;
        }
        match (&self.device, &self.queue) {
            (Some(_), Some(_)) => ContextState::Ready,
            (None, None) => ContextState::Created,
            _ => ContextState::DeviceBound,
        }
    }

    /// 已完成的前向推理次数
    pub fn forward_count(&self) -> u64 {
        self.forward_count
    }

    /// 当前绑定的设备
    pub fn device(&self) -> Option<&Arc<dyn ComputeDevice>> {
        self.device.as_ref()
    }

    fn ensure_usable(&self, op: &str) -> Result<()> {
        if self.released {
            return Err(ContextError::NotBound(format!("{} called on a released context", op)).into());
        }
        if let Some(reason) = &self.lost {
            return Err(ContextError::DeviceLost(format!("{}: {}", op, reason)).into());
        }
        Ok(())
    }

    fn ensure_not_in_flight(&self, op: &str) -> Result<()> {
        if self.in_flight {
            tracing::warn!("{} called while a forward pass is in flight", op);
            return Err(ContextError::ProtocolViolation(format!(
                "{} called while a forward pass is in flight",
                op
            ))
            .into());
        }
        Ok(())
    }

    /// 绑定设备，替换旧设备时只释放本上下文持有的引用
    ///
    /// 前向推理进行中调用返回 `ProtocolViolation`，无效句柄返回 `InvalidArgument`。
    pub fn set_device(&mut self, device: Arc<dyn ComputeDevice>) -> Result<()> {
        self.ensure_usable("set_device")?;
        self.ensure_not_in_flight("set_device")?;
        if !device.is_valid() {
            return Err(ContextError::InvalidArgument(format!(
                "device {} is not a valid handle",
                device.name()
            ))
            .into());
        }
        tracing::info!("Bound {} context to device {}", self.accelerator, device.name());
        self.device = Some(device);
        Ok(())
    }

    /// 绑定命令队列，规则与 [`set_device`](Self::set_device) 相同
    pub fn set_command_queue(&mut self, queue: Arc<dyn CommandQueue>) -> Result<()> {
        self.ensure_usable("set_command_queue")?;
        self.ensure_not_in_flight("set_command_queue")?;
        if !queue.is_valid() {
            return Err(ContextError::InvalidArgument("command queue is not a valid handle".to_string()).into());
        }
        tracing::info!("Bound {} context to command queue", self.accelerator);
        self.queue = Some(queue);
        Ok(())
    }

    /// 加载 SDK 库；失败会被记住，之后的前向推理返回 `LibraryLoad`
    pub fn load_library(&mut self, paths: &[PathBuf], candidates: &[&str]) -> Result<()> {
        self.ensure_usable("load_library")?;
        match self.env.load(paths, candidates) {
            Ok(count) => {
                tracing::info!("{} context has {} accelerator libraries available", self.accelerator, count);
                self.library_failure = None;
                Ok(())
            }
            Err(e) => {
                self.library_failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 不需要 SDK 库的变体使用：记录路径后直接成功
    pub fn skip_library_load(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.ensure_usable("load_library")?;
        tracing::debug!(
            "{} context needs no accelerator libraries, ignoring {} paths",
            self.accelerator,
            paths.len()
        );
        self.library_failure = None;
        Ok(())
    }

    /// 当前命令队列；未设置时返回 `NotBound`
    pub fn command_queue(&self) -> Result<Arc<dyn CommandQueue>> {
        self.ensure_usable("command_queue")?;
        self.queue
            .clone()
            .ok_or_else(|| ContextError::NotBound("no command queue has been set".to_string()).into())
    }

    /// 前向推理开始钩子
    pub fn forward_begin(&mut self) -> Result<()> {
        self.ensure_usable("on_instance_forward_begin")?;
        if self.in_flight {
            tracing::warn!("Forward begin while a forward pass is already in flight");
            return Err(ContextError::ProtocolViolation(
                "forward begin while a forward pass is already in flight".to_string(),
            )
            .into());
        }
        let state = self.state();
        if state != ContextState::Ready {
            return Err(ContextError::NotBound(format!(
                "forward begin requires device and command queue (state: {})",
                state
            ))
            .into());
        }
        if let Some(reason) = &self.library_failure {
            return Err(ContextError::LibraryLoad(reason.clone()).into());
        }

        self.in_flight = true;
        self.profiler.begin_pass();
        tracing::trace!("Forward pass {} started", self.forward_count);
        Ok(())
    }

    /// 前向推理结束钩子
    pub fn forward_end(&mut self) -> Result<()> {
        self.ensure_usable("on_instance_forward_end")?;
        if !self.in_flight {
            tracing::warn!("Forward end without a matching begin");
            return Err(ContextError::ProtocolViolation(
                "forward end without a matching begin".to_string(),
            )
            .into());
        }

        self.in_flight = false;
        self.profiler.end_pass();
        tracing::trace!("Forward pass {} finished", self.forward_count);
        self.forward_count += 1;
        Ok(())
    }

    /// 提交队列中已录制的工作，不等待
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_usable("flush")?;
        let queue = self.command_queue()?;
        queue.flush().map_err(|fault| self.mark_lost(fault.to_string()))
    }

    /// 等待队列空闲；设备故障会使上下文进入 `Lost`
    pub fn synchronize(&mut self) -> Result<()> {
        self.ensure_usable("synchronize")?;
        let queue = self
            .queue
            .clone()
            .ok_or_else(|| ContextError::NotBound("synchronize called before a command queue was set".to_string()))?;
        queue.wait_idle().map_err(|fault| self.mark_lost(fault.to_string()))
    }

    fn mark_lost(&mut self, reason: String) -> crate::AccelBindError {
        tracing::error!("{} device lost: {}", self.accelerator, reason);
        self.device = None;
        self.queue = None;
        self.in_flight = false;
        self.lost = Some(reason.clone());
        ContextError::DeviceLost(reason).into()
    }

    /// 设置线程数，必须为正
    pub fn set_num_threads(&mut self, threads: i64) -> Result<()> {
        self.ensure_usable("set_num_threads")?;
        let threads = usize::try_from(threads)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ContextError::InvalidArgument(format!("thread count must be positive, got {}", threads)))?;
        self.num_threads = threads;
        Ok(())
    }

    /// 线程数
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// 工作区槽位 `index`，至少 `size` 字节
    pub fn workspace(&mut self, size: usize, index: usize) -> Result<&mut [u8]> {
        self.ensure_usable("shared_workspace")?;
        self.workspace.slot(size, index)
    }

    /// 同时取得多个互不重叠的工作区槽位
    pub fn workspaces(&mut self, sizes: &[usize]) -> Result<Vec<&mut [u8]>> {
        self.ensure_usable("shared_workspaces")?;
        self.workspace.slots(sizes)
    }

    /// 开启性能统计窗口
    pub fn start_profile(&mut self) {
        self.profiler.start();
    }

    /// 关闭窗口并取出结果
    pub fn finish_profile(&mut self) -> ProfileResult {
        self.profiler.finish()
    }

    /// 释放句柄与工作区（幂等）
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.device = None;
        self.queue = None;
        self.in_flight = false;
        self.workspace.clear();
        self.released = true;
        tracing::info!(
            "Released {} context after {} forward passes",
            self.accelerator,
            self.forward_count
        );
    }
}

impl fmt::Debug for ContextCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCore")
            .field("accelerator", &self.accelerator)
            .field("state", &self.state())
            .field("device", &self.device)
            .field("num_threads", &self.num_threads)
            .field("forward_count", &self.forward_count)
            .finish()
    }
}

/// 执行上下文接口
///
/// 变体只需提供 [`ContextCore`] 和候选库名，其余操作有共用的默认实现，
/// 需要额外行为的变体（例如前向结束时提交队列）覆盖对应方法即可。
pub trait ExecutionContext: Send + fmt::Debug {
    /// 共用状态
    fn core(&self) -> &ContextCore;

    /// 共用状态（可写）
    fn core_mut(&mut self) -> &mut ContextCore;

    /// 该加速器 SDK 的候选库文件名
    fn library_candidates(&self) -> &'static [&'static str];

    /// 加速器类型
    fn accelerator(&self) -> AcceleratorKind {
        self.core().accelerator()
    }

    /// 当前状态
    fn state(&self) -> ContextState {
        self.core().state()
    }

    /// 设置设备（与创建者共享所有权）
    fn set_device(&mut self, device: Arc<dyn ComputeDevice>) -> Result<()> {
        self.core_mut().set_device(device)
    }

    /// 设置命令队列（设备上下文）
    fn set_command_queue(&mut self, queue: Arc<dyn CommandQueue>) -> Result<()> {
        self.core_mut().set_command_queue(queue)
    }

    /// 在 `paths` 中加载 SDK 库
    fn load_library(&mut self, paths: &[PathBuf]) -> Result<()> {
        let candidates = self.library_candidates();
        self.core_mut().load_library(paths, candidates)
    }

    /// 当前命令队列
    fn command_queue(&self) -> Result<Arc<dyn CommandQueue>> {
        self.core().command_queue()
    }

    /// 每次前向推理开始前调用
    fn on_instance_forward_begin(&mut self) -> Result<()> {
        self.core_mut().forward_begin()
    }

    /// 每次前向推理结束后调用，必须与 begin 配对
    fn on_instance_forward_end(&mut self) -> Result<()> {
        self.core_mut().forward_end()
    }

    /// 阻塞直到队列上的全部工作完成
    fn synchronize(&mut self) -> Result<()> {
        self.core_mut().synchronize()
    }

    /// 设置线程数
    fn set_num_threads(&mut self, threads: i64) -> Result<()> {
        self.core_mut().set_num_threads(threads)
    }

    /// 线程数
    fn num_threads(&self) -> usize {
        self.core().num_threads()
    }

    /// 槽位 0 的共享工作区
    fn shared_workspace(&mut self, size: usize) -> Result<&mut [u8]> {
        self.shared_workspace_at(size, 0)
    }

    /// 槽位 `index` 的共享工作区；同时需要多个槽位时使用
    /// [`shared_workspaces`](Self::shared_workspaces)
    fn shared_workspace_at(&mut self, size: usize, index: usize) -> Result<&mut [u8]> {
        self.core_mut().workspace(size, index)
    }

    /// 同时取得槽位 `0..sizes.len()`，供同一次前向推理中需要并存的临时内存使用
    fn shared_workspaces(&mut self, sizes: &[usize]) -> Result<Vec<&mut [u8]>> {
        self.core_mut().workspaces(sizes)
    }

    /// 开启性能统计
    fn start_profile(&mut self) {
        self.core_mut().start_profile()
    }

    /// 结束性能统计
    fn finish_profile(&mut self) -> ProfileResult {
        self.core_mut().finish_profile()
    }

    /// 释放上下文持有的全部资源
    fn release(&mut self) {
        self.core_mut().release()
    }
}
