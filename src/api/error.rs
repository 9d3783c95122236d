//! 错误类型
//!
//! 绑定、上下文、配置三类错误统一包装为 [`AccelBindError`]，
//! 调用方通过 [`AccelBindError::kind`] 按扁平的 [`ErrorKind`] 分支。

use thiserror::Error;

use crate::binding::Direction;

/// accelbind 错误类型
#[derive(Debug, Error)]
pub enum AccelBindError {
    /// 张量绑定阶段的错误
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// 执行上下文的错误
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// 配置加载或校验错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// 张量绑定错误
///
/// 每个变体都携带出错的张量名，便于批量绑定时定位失败的张量。
#[derive(Debug, Error)]
pub enum BindingError {
    /// 参数不合法
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 同一方向上张量名重复，先登记的条目保留
    #[error("Duplicate {direction} tensor name: {name}")]
    DuplicateName {
        /// 张量名
        name: String,
        /// 输入或输出
        direction: Direction,
    },

    /// 网络查不到该张量的属性
    #[error("Network reports no attributes for tensor: {name}")]
    UnknownTensor {
        /// 张量名
        name: String,
    },

    /// 网络无法列出某个方向的张量名
    #[error("Network cannot report its {direction} tensor names")]
    MissingTensorList {
        /// 输入或输出
        direction: Direction,
    },

    /// 后备存储分配失败，或 SDK 拒绝构造缓冲区句柄
    #[error("Failed to create buffer for tensor {name} ({size} bytes): {reason}")]
    BufferCreation {
        /// 张量名
        name: String,
        /// 请求的字节数
        size: usize,
        /// 失败原因
        reason: String,
    },
}

/// 执行上下文错误
#[derive(Debug, Error)]
pub enum ContextError {
    /// 参数不合法（例如工作区槽位越界）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 没有任何候选 SDK 库能加载
    #[error("Failed to load accelerator library: {0}")]
    LibraryLoad(String),

    /// 设备或队列尚未设置，或上下文已释放
    #[error("Context not bound: {0}")]
    NotBound(String),

    /// 前向钩子调用顺序错误
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// 设备在等待期间报告致命错误
    #[error("Device lost: {0}")]
    DeviceLost(String),

    /// 内存不足
    #[error("Out of memory allocating {size} bytes for {what}: {reason}")]
    OutOfMemory {
        /// 分配用途
        what: String,
        /// 请求的字节数
        size: usize,
        /// 分配器返回的原因
        reason: String,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置源读取或反序列化失败
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// 配置值不合法
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 错误种类
///
/// 扁平化的错误分类，调用方可以直接按种类分支而不必匹配嵌套枚举。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 参数不合法
    InvalidArgument,
    /// 张量名重复
    DuplicateName,
    /// 未知张量
    UnknownTensor,
    /// 网络无法列出张量名
    MissingTensorList,
    /// 缓冲区创建失败
    BufferCreation,
    /// SDK 库加载失败
    LibraryLoad,
    /// 上下文未绑定
    NotBound,
    /// 钩子调用顺序错误
    ProtocolViolation,
    /// 设备丢失
    DeviceLost,
    /// 内存不足
    OutOfMemory,
    /// 配置错误
    Config,
}

impl ErrorKind {
    /// 调用顺序错误：说明上层引擎违反了生命周期约定，运行时无法恢复
    pub fn is_programmer_error(self) -> bool {
        matches!(self, ErrorKind::NotBound | ErrorKind::ProtocolViolation)
    }

    /// 终止性错误：上下文必须重建
    pub fn is_terminal(self) -> bool {
        self == ErrorKind::DeviceLost
    }
}

impl AccelBindError {
    /// 获取错误种类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccelBindError::Binding(e) => match e {
                BindingError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                BindingError::DuplicateName { .. } => ErrorKind::DuplicateName,
                BindingError::UnknownTensor { .. } => ErrorKind::UnknownTensor,
                BindingError::MissingTensorList { .. } => ErrorKind::MissingTensorList,
                BindingError::BufferCreation { .. } => ErrorKind::BufferCreation,
            },
            AccelBindError::Context(e) => match e {
                ContextError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                ContextError::LibraryLoad(_) => ErrorKind::LibraryLoad,
                ContextError::NotBound(_) => ErrorKind::NotBound,
                ContextError::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
                ContextError::DeviceLost(_) => ErrorKind::DeviceLost,
                ContextError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            },
            AccelBindError::Config(_) => ErrorKind::Config,
        }
    }

    /// 出错的张量名（仅绑定错误中存在）
    pub fn tensor_name(&self) -> Option<&str> {
        match self {
            AccelBindError::Binding(BindingError::DuplicateName { name, .. })
            | AccelBindError::Binding(BindingError::UnknownTensor { name })
            | AccelBindError::Binding(BindingError::BufferCreation { name, .. }) => Some(name),
            _ => None,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, AccelBindError>;
