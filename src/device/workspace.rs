//! 共享临时工作区
//!
//! 按槽位管理只增不减的临时缓冲区，跨前向推理复用以避免重复分配。
//! 同一前向推理中需要同时存活的多块临时内存应使用不同槽位。
//! 工作区不是线程安全的：同一上下文上的前向推理必须串行执行。

use crate::api::error::ContextError;
use crate::Result;

/// 共享工作区
#[derive(Debug)]
pub struct SharedWorkspace {
    slots: Vec<Vec<u8>>,
    max_slots: usize,
}

impl SharedWorkspace {
    /// 创建最多 `max_slots` 个槽位的工作区
    pub fn new(max_slots: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_slots,
        }
    }

    /// 获取槽位 `index`，保证至少 `size` 字节
    ///
    /// 槽位不足 `size` 时重新分配为 `size` 字节并清零（原内容不保留）；
    /// 否则原样返回。返回的切片长度为槽位当前大小。
    pub fn slot(&mut self, size: usize, index: usize) -> Result<&mut [u8]> {
        if index >= self.max_slots {
            return Err(ContextError::InvalidArgument(format!(
                "workspace slot {} out of range (max {})",
                index, self.max_slots
            ))
            .into());
        }

        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, Vec::new);
        }

        let slot = &mut self.slots[index];
        if slot.len() < size {
            let mut grown: Vec<u8> = Vec::new();
            grown
                .try_reserve_exact(size)
                .map_err(|e| ContextError::OutOfMemory {
                    what: format!("workspace slot {}", index),
                    size,
                    reason: e.to_string(),
                })?;
            grown.resize(size, 0);
            tracing::debug!(
                "Workspace slot {} grew from {} to {} bytes",
                index,
                slot.len(),
                size
            );
            *slot = grown;
        }
        Ok(&mut slot[..])
    }

    /// 一次取得槽位 `0..sizes.len()`，槽位 `i` 至少 `sizes[i]` 字节
    ///
    /// 返回的切片互不重叠，可以在同一次前向推理中同时使用。
    pub fn slots(&mut self, sizes: &[usize]) -> Result<Vec<&mut [u8]>> {
        for (index, &size) in sizes.iter().enumerate() {
            self.slot(size, index)?;
        }
        Ok(self
            .slots
            .iter_mut()
            .take(sizes.len())
            .map(|slot| &mut slot[..])
            .collect())
    }

    /// 槽位当前大小；未创建的槽位为 0
    pub fn slot_size(&self, index: usize) -> usize {
        self.slots.get(index).map_or(0, Vec::len)
    }

    /// 所有槽位的总字节数
    pub fn total_bytes(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// 释放全部槽位
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorKind;

    #[test]
    fn test_grows_only() {
        let mut ws = SharedWorkspace::new(4);
        assert_eq!(ws.slot(128, 0).unwrap().len(), 128);
        assert_eq!(ws.slot(64, 0).unwrap().len(), 128);
        assert_eq!(ws.slot(256, 0).unwrap().len(), 256);
        assert_eq!(ws.slot_size(0), 256);
    }

    #[test]
    fn test_reused_without_reallocation() {
        let mut ws = SharedWorkspace::new(1);
        let first = ws.slot(512, 0).unwrap().as_ptr();
        let again = ws.slot(100, 0).unwrap().as_ptr();
        assert_eq!(first, again);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut ws = SharedWorkspace::new(4);
        ws.slot(16, 0).unwrap().fill(1);
        ws.slot(32, 2).unwrap();
        assert_eq!(ws.slot_size(1), 0);
        assert_eq!(ws.slot_size(2), 32);
        assert!(ws.slot(16, 0).unwrap().iter().all(|&b| b == 1));
        assert_eq!(ws.total_bytes(), 48);
    }

    #[test]
    fn test_several_slots_live_together() {
        let mut ws = SharedWorkspace::new(4);
        ws.slot(32, 1).unwrap().fill(3);

        let mut slots = ws.slots(&[16, 8, 4]).unwrap();
        assert_eq!(slots.len(), 3);
        let (head, tail) = slots.split_at_mut(1);
        head[0][..8].copy_from_slice(&tail[0][..8]);
        tail[1].fill(9);

        assert!(ws.slot(16, 0).unwrap()[..8].iter().all(|&b| b == 3));
        assert_eq!(ws.slot_size(1), 32);
        assert_eq!(ws.slot(4, 2).unwrap(), &[9, 9, 9, 9]);
    }

    #[test]
    fn test_slots_beyond_limit() {
        let mut ws = SharedWorkspace::new(2);
        let err = ws.slots(&[8, 8, 8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(ws.slots(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_allocation_failure_is_out_of_memory() {
        let mut ws = SharedWorkspace::new(1);
        let err = ws.slot(usize::MAX, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
        assert!(err.to_string().contains("workspace slot 0"));
        assert_eq!(ws.slot_size(0), 0);
    }

    #[test]
    fn test_slot_out_of_range() {
        let mut ws = SharedWorkspace::new(2);
        let err = ws.slot(8, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
