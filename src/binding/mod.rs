//! 张量缓冲区绑定
//!
//! 把网络声明的输入 / 输出张量变成布局正确、可被引擎和加速器 SDK
//! 零拷贝共享的内存。

pub mod builder;
pub mod host;
pub mod network;
pub mod store;
pub mod wrapper;

use std::fmt;

// Re-export commonly used types
pub use builder::{
    build_input_buffers, build_output_buffers, NetworkBinding, TensorBinding, UserBufferMap,
};
pub use host::{HostBufferFactory, HostNetwork, HostUserBuffer};
pub use network::{CompiledNetwork, TensorAttributes, UserBuffer, UserBufferFactory};
pub use store::BackingStore;
pub use wrapper::create_user_buffer;

/// 张量方向，输入与输出是独立的命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// 输入
    Input,
    /// 输出
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}
