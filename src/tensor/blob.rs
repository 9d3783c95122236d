//! Blob：引擎侧的张量描述
//!
//! Blob 记录张量名、维度、数据格式以及指向后备存储的数据指针。
//! Blob 不拥有内存，只是对后备存储条目的弱引用；
//! 内存的生命周期由 [`BackingStore`](crate::binding::BackingStore) 管理。

use crate::tensor::encoding::ElementEncoding;
use crate::utils::ordered_map::OrderedMap;
use std::ptr::NonNull;

/// 数据排布格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// 行主序，通道在最内层
    Nhwc,
}

/// 元素数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32 位浮点
    Float,
    /// 8 位量化整数
    Int8,
}

impl From<ElementEncoding> for DataType {
    fn from(encoding: ElementEncoding) -> Self {
        match encoding {
            ElementEncoding::Quantized8 => DataType::Int8,
            ElementEncoding::Float32 => DataType::Float,
        }
    }
}

/// Blob 描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobDesc {
    /// 张量名
    pub name: String,
    /// 形状，与网络报告的一致
    pub dims: Vec<usize>,
    /// 排布格式
    pub data_format: DataFormat,
    /// 元素类型
    pub data_type: DataType,
}

/// Blob 数据句柄
///
/// `base` 指向后备存储条目的首字节，`bytes` 为条目长度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHandle {
    base: NonNull<u8>,
    bytes: usize,
}

impl BlobHandle {
    /// 由后备存储条目的基址和长度构造句柄
    pub fn new(base: NonNull<u8>, bytes: usize) -> Self {
        Self { base, bytes }
    }

    /// 条目首地址
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// 条目字节数
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

// SAFETY: 句柄只是地址，不拥有内存；被引用的后备存储在绑定期间地址固定且
// 只在无前向推理进行时才会被修改，因此跨线程传递与共享读取是安全的。
unsafe impl Send for BlobHandle {}
unsafe impl Sync for BlobHandle {}

/// 引擎侧张量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    desc: BlobDesc,
    handle: BlobHandle,
}

impl Blob {
    /// 由描述和数据句柄构造
    pub fn new(desc: BlobDesc, handle: BlobHandle) -> Self {
        Self { desc, handle }
    }

    /// 描述
    pub fn desc(&self) -> &BlobDesc {
        &self.desc
    }

    /// 数据句柄
    pub fn handle(&self) -> BlobHandle {
        self.handle
    }

    /// 张量名
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// 形状
    pub fn dims(&self) -> &[usize] {
        &self.desc.dims
    }

    /// 数据首地址，与后备存储条目相同
    pub fn data_ptr(&self) -> *mut u8 {
        self.handle.base()
    }

    /// 数据字节数
    pub fn byte_size(&self) -> usize {
        self.handle.bytes()
    }
}

/// 名称 → Blob，按网络报告顺序排列
pub type BlobMap = OrderedMap<Blob>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_aliases_slice() {
        let mut data = vec![0u8; 24];
        let handle = BlobHandle::new(NonNull::new(data.as_mut_ptr()).unwrap(), data.len());
        let blob = Blob::new(
            BlobDesc {
                name: "x".to_string(),
                dims: vec![2, 3, 4],
                data_format: DataFormat::Nhwc,
                data_type: DataType::Int8,
            },
            handle,
        );

        assert_eq!(blob.data_ptr(), data.as_mut_ptr());
        assert_eq!(blob.byte_size(), 24);
        assert_eq!(blob.dims(), &[2, 3, 4]);
    }

    #[test]
    fn test_empty_handle() {
        let handle = BlobHandle::new(NonNull::dangling(), 0);
        assert_eq!(handle.bytes(), 0);
        assert!(!handle.base().is_null());
    }

    #[test]
    fn test_data_type_from_encoding() {
        assert_eq!(DataType::from(ElementEncoding::Float32), DataType::Float);
        assert_eq!(DataType::from(ElementEncoding::Quantized8), DataType::Int8);
    }
}
