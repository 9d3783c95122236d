//! 进程内网络与缓冲区工厂
//!
//! CPU 回退路径没有外部 SDK，使用这里的实现描述网络并构造缓冲区句柄。
//! 工厂的校验规则与真实 SDK 一致，只依赖它能看到的信息（地址、大小、步长、编码）。

use crate::binding::network::{CompiledNetwork, TensorAttributes, UserBuffer, UserBufferFactory};
use crate::tensor::encoding::BufferEncoding;
use std::collections::HashMap;

/// 进程内用户缓冲区
#[derive(Debug)]
pub struct HostUserBuffer {
    // 以 usize 保存地址，使句柄满足 Send/Sync
    data: usize,
    size: usize,
    strides: Vec<usize>,
    encoding: BufferEncoding,
}

impl UserBuffer for HostUserBuffer {
    fn data_ptr(&self) -> *const u8 {
        self.data as *const u8
    }

    fn size(&self) -> usize {
        self.size
    }

    fn strides(&self) -> &[usize] {
        &self.strides
    }

    fn encoding(&self) -> BufferEncoding {
        self.encoding
    }
}

/// 进程内缓冲区工厂
///
/// 拒绝以下请求：
/// - 空指针
/// - 最内层步长不等于元素宽度
/// - 步长不满足紧密排列（外层步长必须是内层步长的整数倍，0 只能向外传播）
/// - 非空缓冲区的大小不是最外层步长的整数倍
/// - 超过 `max_buffer_size`
#[derive(Debug, Default)]
pub struct HostBufferFactory {
    max_buffer_size: Option<usize>,
}

impl HostBufferFactory {
    /// 不限制缓冲区大小的工厂
    pub fn new() -> Self {
        Self::default()
    }

    /// 限制单个缓冲区的最大字节数（模拟设备内存上限）
    pub fn with_max_buffer_size(max_buffer_size: usize) -> Self {
        Self {
            max_buffer_size: Some(max_buffer_size),
        }
    }

    fn accepts(&self, size: usize, strides: &[usize], encoding: &BufferEncoding) -> bool {
        if let Some(limit) = self.max_buffer_size {
            if size > limit {
                return false;
            }
        }

        let Some(&innermost) = strides.last() else {
            return size == 0;
        };
        if innermost != encoding.element_size() {
            return false;
        }

        let dense = strides.windows(2).all(|pair| match (pair[0], pair[1]) {
            (_, 0) => pair[0] == 0,
            (outer, inner) => outer % inner == 0,
        });
        if !dense {
            return false;
        }

        match (size, strides[0]) {
            (0, _) => true,
            (_, 0) => false,
            (size, outer) => size % outer == 0,
        }
    }
}

impl UserBufferFactory for HostBufferFactory {
    fn create_user_buffer(
        &self,
        data: *mut u8,
        size: usize,
        strides: &[usize],
        encoding: &BufferEncoding,
    ) -> Option<Box<dyn UserBuffer>> {
        if data.is_null() || !self.accepts(size, strides, encoding) {
            return None;
        }
        Some(Box::new(HostUserBuffer {
            data: data as usize,
            size,
            strides: strides.to_vec(),
            encoding: *encoding,
        }))
    }
}

/// 进程内网络描述
///
/// 由 `(名称, 形状)` 列表构造，输入和输出的名称顺序即声明顺序。
#[derive(Debug)]
pub struct HostNetwork {
    inputs: Vec<String>,
    outputs: Vec<String>,
    attributes: HashMap<String, TensorAttributes>,
    factory: HostBufferFactory,
    reports_names: bool,
}

impl HostNetwork {
    /// 没有任何张量的网络
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: HashMap::new(),
            factory: HostBufferFactory::new(),
            reports_names: true,
        }
    }

    /// 声明输入张量
    pub fn with_input(mut self, name: impl Into<String>, dims: Vec<usize>) -> Self {
        let name = name.into();
        self.attributes.insert(name.clone(), TensorAttributes::new(dims));
        self.inputs.push(name);
        self
    }

    /// 声明输出张量
    pub fn with_output(mut self, name: impl Into<String>, dims: Vec<usize>) -> Self {
        let name = name.into();
        self.attributes.insert(name.clone(), TensorAttributes::new(dims));
        self.outputs.push(name);
        self
    }

    /// 声明一个出现在输出名称列表中、但查询不到属性的张量
    pub fn with_undescribed_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    /// 替换缓冲区工厂
    pub fn with_factory(mut self, factory: HostBufferFactory) -> Self {
        self.factory = factory;
        self
    }

    /// 模拟无法报告张量名列表的网络
    pub fn without_name_lists(mut self) -> Self {
        self.reports_names = false;
        self
    }
}

impl Default for HostNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl CompiledNetwork for HostNetwork {
    fn tensor_attributes(&self, name: &str) -> Option<TensorAttributes> {
        self.attributes.get(name).cloned()
    }

    fn input_tensor_names(&self) -> Option<Vec<String>> {
        self.reports_names.then(|| self.inputs.clone())
    }

    fn output_tensor_names(&self) -> Option<Vec<String>> {
        self.reports_names.then(|| self.outputs.clone())
    }

    fn buffer_factory(&self) -> &dyn UserBufferFactory {
        &self.factory
    }
}
