//! 配置加载

use crate::api::error::ConfigError;
use crate::config::defaults::{ENV_PREFIX, ENV_SEPARATOR};
use crate::config::settings::Config;
use crate::Result;
use config::{Config as ConfigBuilder, Environment, File};

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("runtime.library_paths")
        .with_list_parse_key("npu.runtime_order")
        .with_list_parse_key("logging.output")
}

/// 从文件加载配置，环境变量覆盖文件中的值
pub fn load_from_file(path: &str) -> Result<Config> {
    let config = ConfigBuilder::builder()
        .add_source(File::with_name(path))
        .add_source(environment())
        .build()
        .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

    finish(config)
}

/// 从环境变量加载配置
pub fn load_from_env() -> Result<Config> {
    let config = ConfigBuilder::builder()
        .add_source(environment())
        .build()
        .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

    finish(config)
}

fn finish(config: ConfigBuilder) -> Result<Config> {
    let config: Config = config
        .try_deserialize()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
