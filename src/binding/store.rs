//! 后备存储分配器
//!
//! 按张量名持有应用侧字节缓冲区，是原始内存的唯一所有者。
//! 每个条目创建后不再改变大小，地址在绑定期间固定。
//! 条目以裸指针持有内存：读写切片、Blob 和加速器缓冲区句柄都从同一个基址派生，
//! 因此多次取得的可变切片不会使先前交出的别名失效。

use crate::api::error::BindingError;
use crate::binding::Direction;
use crate::tensor::blob::BlobHandle;
use crate::utils::ordered_map::OrderedMap;
use crate::Result;
use std::collections::TryReserveError;
use std::fmt;
use std::ptr::{self, NonNull};

/// 固定地址的零初始化字节缓冲区
struct StoreEntry {
    base: NonNull<u8>,
    len: usize,
}

impl StoreEntry {
    fn zeroed(len: usize) -> std::result::Result<Self, TryReserveError> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.try_reserve_exact(len)?;
        buffer.resize(len, 0);
        let raw = Box::into_raw(buffer.into_boxed_slice()) as *mut u8;
        // SAFETY: Box 的指针永远非空（空切片为悬垂但非空的对齐指针）
        let base = unsafe { NonNull::new_unchecked(raw) };
        Ok(Self { base, len })
    }

    fn handle(&self) -> BlobHandle {
        BlobHandle::new(self.base, self.len)
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: base..base+len 由本条目独占分配并已初始化
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: 同上；&mut self 保证 Rust 侧没有其他切片同时存活
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

impl Drop for StoreEntry {
    fn drop(&mut self) {
        // SAFETY: base/len 来自 zeroed 中的 Box::into_raw，只在这里还原一次
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.base.as_ptr(),
                self.len,
            )));
        }
    }
}

impl fmt::Debug for StoreEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreEntry")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}

// SAFETY: 条目独占其内存，与 Box<[u8]> 一样可以跨线程移动和共享只读访问
unsafe impl Send for StoreEntry {}
unsafe impl Sync for StoreEntry {}

/// 后备存储
#[derive(Debug)]
pub struct BackingStore {
    direction: Direction,
    entries: OrderedMap<StoreEntry>,
}

impl BackingStore {
    /// 创建指定方向（输入 / 输出）的存储，两个方向是独立的命名空间
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            entries: OrderedMap::new(),
        }
    }

    /// 存储所属方向
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// 分配一个零初始化、大小恰为 `byte_size` 的缓冲区，返回指向它的句柄
    ///
    /// 名称已存在时返回 `DuplicateName`，原有条目保持不变。
    pub fn allocate(&mut self, name: &str, byte_size: usize) -> Result<BlobHandle> {
        if self.entries.contains(name) {
            return Err(BindingError::DuplicateName {
                name: name.to_string(),
                direction: self.direction,
            }
            .into());
        }

        let entry = StoreEntry::zeroed(byte_size).map_err(|e| BindingError::BufferCreation {
            name: name.to_string(),
            size: byte_size,
            reason: format!("backing store allocation failed: {}", e),
        })?;
        let handle = entry.handle();
        self.entries.insert(name, entry);
        tracing::trace!("Allocated {} backing store for {}: {} bytes", self.direction, name, byte_size);
        Ok(handle)
    }

    /// 条目的只读视图
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(StoreEntry::as_slice)
    }

    /// 条目的可写视图
    pub fn get_mut(&mut self, name: &str) -> Option<&mut [u8]> {
        self.entries.get_mut(name).map(StoreEntry::as_mut_slice)
    }

    /// 是否已有该名称的条目
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否没有任何条目
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按分配顺序列出名称
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.names()
    }

    /// 所有条目的总字节数
    pub fn total_bytes(&self) -> usize {
        self.entries.values().map(|entry| entry.len).sum()
    }

    /// 释放所有条目
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorKind;

    #[test]
    fn test_allocate_zeroed() {
        let mut store = BackingStore::new(Direction::Input);
        let handle = store.allocate("x", 96).unwrap();
        assert_eq!(handle.bytes(), 96);
        assert!(store.get("x").unwrap().iter().all(|&b| b == 0));
        assert_eq!(store.total_bytes(), 96);
    }

    #[test]
    fn test_duplicate_name_keeps_first_entry() {
        let mut store = BackingStore::new(Direction::Output);
        store.allocate("x", 8).unwrap();
        store.get_mut("x").unwrap()[0] = 7;

        let err = store.allocate("x", 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(err.tensor_name(), Some("x"));

        let entry = store.get("x").unwrap();
        assert_eq!(entry.len(), 8);
        assert_eq!(entry[0], 7);
    }

    #[test]
    fn test_address_stable_across_growth() {
        let mut store = BackingStore::new(Direction::Input);
        let first = store.allocate("a", 64).unwrap().base();
        for i in 0..32 {
            store.allocate(&format!("t{}", i), 128).unwrap();
        }
        assert_eq!(store.get("a").unwrap().as_ptr(), first as *const u8);
    }

    #[test]
    fn test_handle_stays_valid_across_mutable_access() {
        let mut store = BackingStore::new(Direction::Input);
        let handle = store.allocate("x", 4).unwrap();

        store.get_mut("x").unwrap().copy_from_slice(&[1, 2, 3, 4]);
        let seen = unsafe { std::slice::from_raw_parts(handle.base(), handle.bytes()) };
        assert_eq!(seen, &[1, 2, 3, 4]);

        unsafe { handle.base().add(3).write(9) };
        store.get_mut("x").unwrap()[0] = 5;
        assert_eq!(store.get("x").unwrap(), &[5, 2, 3, 9]);
    }

    #[test]
    fn test_zero_sized_entry() {
        let mut store = BackingStore::new(Direction::Input);
        assert_eq!(store.allocate("empty", 0).unwrap().bytes(), 0);
        assert!(store.contains("empty"));
        assert!(store.get("empty").unwrap().is_empty());
    }

    #[test]
    fn test_allocation_failure() {
        let mut store = BackingStore::new(Direction::Output);
        let err = store.allocate("huge", usize::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferCreation);
        assert_eq!(err.tensor_name(), Some("huge"));
        assert!(!store.contains("huge"));
    }
}
