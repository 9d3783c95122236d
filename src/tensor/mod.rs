//! 张量描述：字节步长、元素编码与引擎侧 Blob

pub mod blob;
pub mod encoding;
pub mod layout;

// Re-export commonly used types
pub use blob::{Blob, BlobDesc, BlobHandle, BlobMap, DataFormat, DataType};
pub use encoding::{BufferEncoding, ElementEncoding};
pub use layout::{byte_strides, element_count, Dims};
