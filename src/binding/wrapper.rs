//! 加速器缓冲区包装
//!
//! 为单个张量计算布局、分配后备存储，并在同一块内存上同时构造
//! 加速器原生缓冲区句柄和引擎侧 Blob。

use crate::api::error::BindingError;
use crate::binding::builder::TensorBinding;
use crate::binding::network::CompiledNetwork;
use crate::tensor::blob::{Blob, BlobDesc, DataFormat, DataType};
use crate::tensor::encoding::ElementEncoding;
use crate::tensor::layout;
use crate::Result;

/// 为张量 `name` 创建用户缓冲区并登记到 `binding`
///
/// 形状以网络报告的属性为准。流程：
/// 1. 查询张量属性，查不到时返回 `UnknownTensor`
/// 2. 按网络形状计算步长和字节数
/// 3. 在后备存储中分配零初始化的条目（重名返回 `DuplicateName`）
/// 4. 通过 SDK 工厂在该条目上构造缓冲区句柄，被拒绝时返回 `BufferCreation`
/// 5. 构造别名同一内存的 NHWC Blob，并把两者按名称插入映射
///
/// 第 4 步失败时，已分配的后备存储条目保留，便于诊断；映射中不会出现该张量。
pub fn create_user_buffer(
    binding: &mut TensorBinding,
    network: &dyn CompiledNetwork,
    name: &str,
    encoding: ElementEncoding,
) -> Result<()> {
    let attributes = network
        .tensor_attributes(name)
        .ok_or_else(|| BindingError::UnknownTensor {
            name: name.to_string(),
        })?;
    let dims = attributes.dims;

    let element_size = encoding.element_size();
    let strides = layout::byte_strides(&dims, element_size);
    let size = layout::element_count(&dims, element_size);
    debug_assert!(layout::addressed_span(&dims, &strides, element_size) <= size);

    let direction = binding.direction();
    let handle = binding.store.allocate(name, size)?;

    let buffer_encoding = encoding.buffer_encoding();
    let user_buffer = network.buffer_factory().create_user_buffer(
        handle.base(),
        size,
        &strides,
        &buffer_encoding,
    );
    let Some(user_buffer) = user_buffer else {
        tracing::warn!(
            "Error while creating {} user buffer for {}: dims={:?}, strides={:?}, size={}",
            direction,
            name,
            dims,
            strides,
            size
        );
        return Err(BindingError::BufferCreation {
            name: name.to_string(),
            size,
            reason: format!("SDK rejected strides {:?} with encoding {}", strides, encoding),
        }
        .into());
    };

    tracing::debug!(
        "Bound {} tensor {}: dims={:?}, strides={:?}, bytes={}, encoding={}",
        direction,
        name,
        dims,
        strides,
        size,
        encoding
    );

    let desc = BlobDesc {
        name: name.to_string(),
        dims,
        data_format: DataFormat::Nhwc,
        data_type: DataType::from(encoding),
    };
    binding.buffers.insert(name, user_buffer);
    binding.blobs.insert(name, Blob::new(desc, handle));
    Ok(())
}
