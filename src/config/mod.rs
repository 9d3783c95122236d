//! 配置
//!
//! 文件（TOML / JSON / YAML，由 `config` 按扩展名识别）与 `ACCELBIND__` 前缀的环境变量分层加载。

pub mod defaults;
pub mod loader;
pub mod settings;

pub use settings::{BindingConfig, Config, LoggingConfig, NpuConfig, RuntimeConfig};
