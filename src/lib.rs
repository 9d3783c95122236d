//! accelbind - 加速器推理的设备绑定层
//!
//! 把编译好的网络接到加速器上：
//! - [`tensor`]: 字节步长计算、元素编码和引擎侧 Blob
//! - [`binding`]: 后备存储分配、加速器缓冲区包装、命名缓冲区映射构建
//! - [`device`]: 执行上下文（设备 / 队列句柄、SDK 库加载、前向钩子、共享工作区）
//! - [`config`] / [`utils::logging`]: 分层配置与日志初始化

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod binding;
pub mod config;
pub mod device;
pub mod tensor;
pub mod utils;

// Re-export commonly used types
pub use crate::api::error::{AccelBindError, ErrorKind, Result};
pub use crate::binding::{Direction, NetworkBinding, TensorBinding};
pub use crate::config::Config;
pub use crate::device::{create_context, AcceleratorKind, ContextState, ExecutionContext};
pub use crate::tensor::ElementEncoding;

/// accelbind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
