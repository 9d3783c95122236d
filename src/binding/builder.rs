//! 命名缓冲区映射构建
//!
//! 遍历网络声明的输入（或输出）张量名，为每个名称调用
//! [`create_user_buffer`]，同时得到两张并行的注册表：
//! - 加速器原生缓冲区映射，直接交给 SDK 的执行调用
//! - 引擎侧 Blob 映射，供推理运行时的其余部分使用
//!
//! 两张映射都保持网络报告的名称顺序。

use crate::api::error::BindingError;
use crate::binding::network::{CompiledNetwork, UserBuffer};
use crate::binding::store::BackingStore;
use crate::binding::wrapper::create_user_buffer;
use crate::binding::Direction;
use crate::tensor::blob::{Blob, BlobMap};
use crate::tensor::encoding::ElementEncoding;
use crate::utils::ordered_map::OrderedMap;
use crate::Result;

/// 名称 → 加速器缓冲区句柄，按网络报告顺序排列
pub type UserBufferMap = OrderedMap<Box<dyn UserBuffer>>;

/// 单一方向（输入或输出）的绑定结果
///
/// 字段声明顺序即析构顺序：缓冲区句柄和 Blob 先于它们别名的后备存储释放。
/// 绑定完成后只读，可被多个执行算子的线程并发读取；
/// 在任何前向推理可能读取它时不得重新绑定。
#[derive(Debug)]
pub struct TensorBinding {
    pub(crate) buffers: UserBufferMap,
    pub(crate) blobs: BlobMap,
    pub(crate) store: BackingStore,
}

impl TensorBinding {
    /// 创建某个方向的空绑定
    pub fn new(direction: Direction) -> Self {
        Self {
            buffers: UserBufferMap::new(),
            blobs: BlobMap::new(),
            store: BackingStore::new(direction),
        }
    }

    /// 绑定方向
    pub fn direction(&self) -> Direction {
        self.store.direction()
    }

    /// 加速器缓冲区映射
    pub fn user_buffers(&self) -> &UserBufferMap {
        &self.buffers
    }

    /// 按名称查找加速器缓冲区
    pub fn user_buffer(&self, name: &str) -> Option<&dyn UserBuffer> {
        self.buffers.get(name).map(|buffer| &**buffer)
    }

    /// Blob 映射
    pub fn blobs(&self) -> &BlobMap {
        &self.blobs
    }

    /// 按名称查找 Blob
    pub fn blob(&self, name: &str) -> Option<&Blob> {
        self.blobs.get(name)
    }

    /// 后备存储
    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    /// 可写访问某个张量的后备存储（用于填充输入或读取输出）
    pub fn data_mut(&mut self, name: &str) -> Option<&mut [u8]> {
        self.store.get_mut(name)
    }

    /// 已绑定的张量数
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// 是否没有绑定任何张量
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// 释放绑定：先释放句柄和 Blob，再释放内存
    pub fn release(&mut self) {
        self.buffers.clear();
        self.blobs.clear();
        self.store.clear();
    }
}

/// 构建输入缓冲区映射
pub fn build_input_buffers(
    network: &dyn CompiledNetwork,
    inputs: &mut TensorBinding,
    encoding: ElementEncoding,
) -> Result<()> {
    build_buffers(network, inputs, Direction::Input, encoding)
}

/// 构建输出缓冲区映射
pub fn build_output_buffers(
    network: &dyn CompiledNetwork,
    outputs: &mut TensorBinding,
    encoding: ElementEncoding,
) -> Result<()> {
    build_buffers(network, outputs, Direction::Output, encoding)
}

/// 按网络报告的顺序逐个绑定张量
///
/// 遇到第一个失败的张量即返回其错误；此前已绑定的条目保留在 `binding` 中，
/// 不做回滚，调用方可以检查部分绑定的状态。
fn build_buffers(
    network: &dyn CompiledNetwork,
    binding: &mut TensorBinding,
    direction: Direction,
    encoding: ElementEncoding,
) -> Result<()> {
    if binding.direction() != direction {
        return Err(BindingError::InvalidArgument(format!(
            "cannot build {} buffers into an {} binding",
            direction,
            binding.direction()
        ))
        .into());
    }

    let names = match direction {
        Direction::Input => network.input_tensor_names(),
        Direction::Output => network.output_tensor_names(),
    }
    .ok_or(BindingError::MissingTensorList { direction })?;

    if names.is_empty() {
        tracing::debug!("Network declares no {} tensors", direction);
        return Ok(());
    }

    for name in &names {
        create_user_buffer(binding, network, name, encoding)?;
    }

    tracing::info!(
        "Bound {} {} tensors ({} bytes)",
        names.len(),
        direction,
        binding.store.total_bytes()
    );
    Ok(())
}

/// 整个网络的绑定：输入与输出各自独立的命名空间
#[derive(Debug)]
pub struct NetworkBinding {
    encoding: ElementEncoding,
    inputs: TensorBinding,
    outputs: TensorBinding,
}

impl NetworkBinding {
    /// 创建空绑定，所有张量使用 `encoding`
    pub fn new(encoding: ElementEncoding) -> Self {
        Self {
            encoding,
            inputs: TensorBinding::new(Direction::Input),
            outputs: TensorBinding::new(Direction::Output),
        }
    }

    /// 元素编码
    pub fn encoding(&self) -> ElementEncoding {
        self.encoding
    }

    /// 绑定输入再绑定输出；输入失败时不会尝试输出
    pub fn bind(&mut self, network: &dyn CompiledNetwork) -> Result<()> {
        self.bind_inputs(network)?;
        self.bind_outputs(network)
    }

    /// 只绑定输入
    pub fn bind_inputs(&mut self, network: &dyn CompiledNetwork) -> Result<()> {
        build_input_buffers(network, &mut self.inputs, self.encoding)
    }

    /// 只绑定输出
    pub fn bind_outputs(&mut self, network: &dyn CompiledNetwork) -> Result<()> {
        build_output_buffers(network, &mut self.outputs, self.encoding)
    }

    /// 输入绑定
    pub fn inputs(&self) -> &TensorBinding {
        &self.inputs
    }

    /// 输入绑定（可写）
    pub fn inputs_mut(&mut self) -> &mut TensorBinding {
        &mut self.inputs
    }

    /// 输出绑定
    pub fn outputs(&self) -> &TensorBinding {
        &self.outputs
    }

    /// 输出绑定（可写）
    pub fn outputs_mut(&mut self) -> &mut TensorBinding {
        &mut self.outputs
    }

    /// 拆除整个绑定
    pub fn release(&mut self) {
        self.inputs.release();
        self.outputs.release();
        tracing::debug!("Released network binding");
    }
}
