//! 张量内存布局计算
//!
//! 根据维度序列和元素宽度计算总字节数与逐维字节步长（行主序，最内维连续）。
//!
//! 所有尺寸使用 `usize`（在支持的平台上为 64 位）。乘法采用饱和运算：
//! 极端形状会得到一个无法分配的尺寸，而不是回绕成一个偏小的缓冲区。

/// 维度序列，最外层维度在前
pub type Dims = [usize];

/// 计算张量所需的字节数
///
/// - 维度序列为空时返回 0
/// - 任一维度为 0 时结果为 0：累加器被清零后仍继续与后续维度相乘，结果保持为 0
///
/// 注意：把空张量和含 0 维的张量视为合法的 0 字节张量，而不是错误。
/// 下游代码依赖这一行为，请勿“修正”。
pub fn element_count(dims: &Dims, element_width: usize) -> usize {
    if dims.is_empty() {
        return 0;
    }
    dims.iter()
        .fold(element_width, |size, &dim| size.saturating_mul(dim))
}

/// 计算逐维字节步长
///
/// `strides[last] = element_width`，`strides[i] = strides[i + 1] * dims[i + 1]`。
/// 若第 `i` 维为 0，则 `0..i` 的步长全部为 0（沿外层方向传播），
/// `i..` 的步长不受影响。最外层维度本身不参与步长计算。
pub fn byte_strides(dims: &Dims, element_width: usize) -> Vec<usize> {
    let rank = dims.len();
    if rank == 0 {
        return Vec::new();
    }

    let mut strides = vec![0; rank];
    let mut stride = element_width;
    strides[rank - 1] = stride;
    for i in (1..rank).rev() {
        stride = stride.saturating_mul(dims[i]);
        strides[i - 1] = stride;
    }
    strides
}

/// 按步长寻址时访问到的字节跨度（最后一个元素末尾的偏移量）
///
/// 任一维度为 0 时跨度为 0。
pub fn addressed_span(dims: &Dims, strides: &[usize], element_width: usize) -> usize {
    if dims.is_empty() || dims.contains(&0) {
        return 0;
    }
    let last_offset = dims
        .iter()
        .zip(strides)
        .fold(0usize, |acc, (&dim, &stride)| {
            acc.saturating_add((dim - 1).saturating_mul(stride))
        });
    last_offset.saturating_add(element_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_count_dense() {
        assert_eq!(element_count(&[2, 3, 4], 4), 96);
        assert_eq!(element_count(&[2, 3, 4], 1), 24);
        assert_eq!(element_count(&[7], 4), 28);
    }

    #[test]
    fn test_element_count_empty_rank() {
        assert_eq!(element_count(&[], 4), 0);
        assert_eq!(element_count(&[], 1), 0);
    }

    // 含 0 维的张量大小为 0，即使后面还有非零维度
    #[test]
    fn test_element_count_zero_dim_quirk() {
        assert_eq!(element_count(&[0, 3, 4], 4), 0);
        assert_eq!(element_count(&[2, 0, 4], 4), 0);
        assert_eq!(element_count(&[2, 3, 0], 4), 0);
        assert_eq!(element_count(&[5, 0, 9, 9, 9], 1), 0);
    }

    #[test]
    fn test_element_count_saturates() {
        assert_eq!(element_count(&[usize::MAX, 2], 4), usize::MAX);
    }

    #[test]
    fn test_strides_dense() {
        // 2x4x3 float 张量紧密排列在 96 字节中，步长为 (48, 12, 4)
        assert_eq!(byte_strides(&[2, 4, 3], 4), vec![48, 12, 4]);
        assert_eq!(byte_strides(&[2, 3, 4], 1), vec![12, 4, 1]);
        assert_eq!(byte_strides(&[5], 4), vec![4]);
        assert!(byte_strides(&[], 4).is_empty());
    }

    #[test]
    fn test_strides_recurrence() {
        let dims = [3, 5, 7, 2];
        let strides = byte_strides(&dims, 4);
        assert_eq!(strides[dims.len() - 1], 4);
        for i in 0..dims.len() - 1 {
            assert_eq!(strides[i], strides[i + 1] * dims[i + 1]);
        }
    }

    #[test]
    fn test_strides_zero_dim_propagates_outward() {
        assert_eq!(byte_strides(&[2, 0, 4], 4), vec![0, 16, 4]);
        assert_eq!(byte_strides(&[2, 3, 0], 4), vec![0, 0, 4]);
        // 最外层维度为 0 不影响步长
        assert_eq!(byte_strides(&[0, 3, 4], 4), vec![48, 16, 4]);
    }

    #[test]
    fn test_addressed_span() {
        let dims = [2, 3, 4];
        let strides = byte_strides(&dims, 4);
        assert_eq!(addressed_span(&dims, &strides, 4), element_count(&dims, 4));
        assert_eq!(addressed_span(&[2, 0], &[0, 4], 4), 0);
        assert_eq!(addressed_span(&[], &[], 4), 0);
    }
}
