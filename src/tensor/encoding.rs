//! 元素编码
//!
//! 调用方只选择编码种类（[`ElementEncoding`]），绑定层据此构造
//! 加速器原生的缓冲区编码描述（[`BufferEncoding`]）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 元素编码种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementEncoding {
    /// 8 位量化（带零点与缩放）
    #[serde(alias = "tf8")]
    Quantized8,
    /// 32 位浮点
    #[default]
    #[serde(alias = "float")]
    Float32,
}

impl ElementEncoding {
    /// 每个元素的字节宽度
    pub fn element_size(self) -> usize {
        match self {
            ElementEncoding::Quantized8 => std::mem::size_of::<u8>(),
            ElementEncoding::Float32 => std::mem::size_of::<f32>(),
        }
    }

    /// 构造加速器原生编码描述
    ///
    /// 量化缓冲区使用中性参数：零点 0，缩放 1.0。
    pub fn buffer_encoding(self) -> BufferEncoding {
        match self {
            ElementEncoding::Quantized8 => BufferEncoding::Tf8 {
                zero_point: 0,
                scale: 1.0,
            },
            ElementEncoding::Float32 => BufferEncoding::Float,
        }
    }
}

impl fmt::Display for ElementEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementEncoding::Quantized8 => write!(f, "tf8"),
            ElementEncoding::Float32 => write!(f, "float"),
        }
    }
}

/// 加速器原生缓冲区编码
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferEncoding {
    /// 8 位定点量化
    Tf8 {
        /// 量化零点
        zero_point: u64,
        /// 量化步长
        scale: f32,
    },
    /// 32 位浮点，无额外参数
    Float,
}

impl BufferEncoding {
    /// 每个元素的字节宽度
    pub fn element_size(&self) -> usize {
        match self {
            BufferEncoding::Tf8 { .. } => ElementEncoding::Quantized8.element_size(),
            BufferEncoding::Float => ElementEncoding::Float32.element_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_size() {
        assert_eq!(ElementEncoding::Quantized8.element_size(), 1);
        assert_eq!(ElementEncoding::Float32.element_size(), 4);
    }

    #[test]
    fn test_quantized_uses_neutral_parameters() {
        match ElementEncoding::Quantized8.buffer_encoding() {
            BufferEncoding::Tf8 { zero_point, scale } => {
                assert_eq!(zero_point, 0);
                assert_eq!(scale, 1.0);
            }
            other => panic!("Expected Tf8 encoding, got {:?}", other),
        }
        assert_eq!(ElementEncoding::Float32.buffer_encoding(), BufferEncoding::Float);
    }

    #[test]
    fn test_encoding_serialization() {
        let json = serde_json::to_string(&ElementEncoding::Quantized8).unwrap();
        assert_eq!(json, "\"quantized8\"");
        let parsed: ElementEncoding = serde_json::from_str("\"tf8\"").unwrap();
        assert_eq!(parsed, ElementEncoding::Quantized8);
        let parsed: ElementEncoding = serde_json::from_str("\"float\"").unwrap();
        assert_eq!(parsed, ElementEncoding::Float32);
    }
}
