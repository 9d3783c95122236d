//! 保持插入顺序的名称映射
//!
//! 绑定层的缓冲区映射和 Blob 映射都需要按网络报告的张量顺序遍历，
//! 同时支持按名称查找。

use std::collections::HashMap;

/// 名称 → 值，按插入顺序迭代
#[derive(Debug)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> OrderedMap<V> {
    /// 空映射
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// 插入条目；名称已存在时不覆盖，返回被拒绝的值
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Some(value);
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        None
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<&V> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// 按名称查找（可写）
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// 是否包含该名称
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按插入顺序列出名称
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// 按插入顺序迭代 `(名称, 值)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// 按插入顺序迭代值
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// 清空映射，按插入的逆序释放条目
    pub fn clear(&mut self) {
        self.index.clear();
        while self.entries.pop().is_some() {}
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
