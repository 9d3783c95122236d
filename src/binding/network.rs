//! 编译后网络的外部接口
//!
//! 绑定层不负责加载模型，只通过 [`CompiledNetwork`] 查询张量名与形状，
//! 并通过 [`UserBufferFactory`] 让加速器 SDK 在应用内存之上构造缓冲区句柄。

use crate::tensor::encoding::BufferEncoding;
use std::fmt;

/// 网络报告的张量属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorAttributes {
    /// 形状，最外层维度在前
    pub dims: Vec<usize>,
}

impl TensorAttributes {
    /// 由形状构造
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// 维数
    pub fn rank(&self) -> usize {
        self.dims.len()
    }
}

/// 加速器原生的用户缓冲区句柄
///
/// 句柄引用应用侧内存但不拥有它；必须在被引用的后备存储释放之前销毁。
pub trait UserBuffer: fmt::Debug + Send + Sync {
    /// 缓冲区首地址
    fn data_ptr(&self) -> *const u8;

    /// 缓冲区字节数
    fn size(&self) -> usize;

    /// 逐维字节步长
    fn strides(&self) -> &[usize];

    /// 编码描述
    fn encoding(&self) -> BufferEncoding;
}

/// 用户缓冲区工厂（SDK 入口）
pub trait UserBufferFactory {
    /// 在 `data..data + size` 之上构造缓冲区句柄；SDK 拒绝时返回 `None`
    fn create_user_buffer(
        &self,
        data: *mut u8,
        size: usize,
        strides: &[usize],
        encoding: &BufferEncoding,
    ) -> Option<Box<dyn UserBuffer>>;
}

/// 编译后的网络句柄
pub trait CompiledNetwork {
    /// 查询张量属性；网络不认识该名称时返回 `None`
    fn tensor_attributes(&self, name: &str) -> Option<TensorAttributes>;

    /// 输入张量名，按网络声明顺序；无法报告时返回 `None`
    fn input_tensor_names(&self) -> Option<Vec<String>>;

    /// 输出张量名，按网络声明顺序；无法报告时返回 `None`
    fn output_tensor_names(&self) -> Option<Vec<String>>;

    /// 缓冲区工厂
    fn buffer_factory(&self) -> &dyn UserBufferFactory;
}
