//! 设备执行上下文
//!
//! 管理推理实例的设备 / 队列句柄、SDK 库加载、前向推理钩子和共享工作区。

pub mod backends;
pub mod context;
pub mod handle;
pub mod library;
pub mod profile;
pub mod workspace;

// Re-export commonly used types
pub use backends::{create_context, CpuContext, GpuContext, NpuBuildOptions, NpuContext, NpuRuntime};
pub use context::{AcceleratorKind, ContextCore, ContextState, ExecutionContext};
pub use handle::{CommandQueue, ComputeDevice, DeviceFault, HostDevice, HostQueue};
pub use library::SdkEnvironment;
pub use profile::{PassTiming, ProfileResult, Profiler};
pub use workspace::SharedWorkspace;
