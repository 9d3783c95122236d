//! 公共 API：错误类型与结果别名

pub mod error;

pub use error::{AccelBindError, BindingError, ConfigError, ContextError, ErrorKind, Result};
