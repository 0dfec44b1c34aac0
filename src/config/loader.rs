//! Configuration Loader
//!
//! 实现多源连接配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（livingkit.toml）
//! 3. 字段默认值

use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use super::types::Connection;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to load configuration: {0}")]
    LoadError(String),

    #[error("unable to parse configuration: {0}")]
    ParseError(String),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["livingkit", "livingkit.local"];

/// 配置文件的顶层结构
#[derive(Debug, Default, Deserialize)]
struct ConnectionsFile {
    #[serde(default)]
    connections: HashMap<String, Connection>,
}

/// 加载全部命名连接配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `LIVINGKIT_`，层级分隔符 `__`）
/// 2. 配置文件（livingkit.toml 或 livingkit.local.toml）
/// 3. 字段默认值
///
/// # 环境变量示例
/// - `LIVINGKIT_CONNECTIONS__DEFAULT__ADDRESS=db.internal:5432`
/// - `LIVINGKIT_CONNECTIONS__DEFAULT__PASSWORD=secret`
/// - `LIVINGKIT_CONNECTIONS__METRICS__ENABLED=false`
pub fn load_connections() -> Result<HashMap<String, Connection>, ConfigError> {
    load_connections_from_path(None)
}

/// 从指定路径加载连接配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_connections_from_path(
    config_path: Option<&Path>,
) -> Result<HashMap<String, Connection>, ConfigError> {
    let mut builder = Config::builder();

    // 1. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 2. 环境变量（最高优先级）
    // 前缀: LIVINGKIT_
    // 层级分隔符: __ (双下划线)
    // 例如: LIVINGKIT_CONNECTIONS__DEFAULT__PASSWORD=secret
    builder = builder.add_source(
        Environment::with_prefix("LIVINGKIT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 3. 构建并反序列化
    let config = builder.build()?;
    let file: ConnectionsFile = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("unable to deserialize connections: {}", e))
    })?;

    // 4. 验证
    validate_connections(&file.connections)?;

    Ok(file.connections)
}

/// 验证连接配置有效性
fn validate_connections(connections: &HashMap<String, Connection>) -> Result<(), ConfigError> {
    for (key, connection) in connections {
        if connection.backend.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "connection '{}': backend cannot be empty",
                key
            )));
        }

        if connection.name.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "connection '{}': database name cannot be empty",
                key
            )));
        }

        // sqlite 走本地文件，不需要地址
        if connection.backend != "sqlite" && connection.address.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "connection '{}': address cannot be empty for backend '{}'",
                key, connection.backend
            )));
        }
    }

    Ok(())
}

/// 打印连接配置（用于启动时日志，不输出密码）
pub fn print_connections(connections: &HashMap<String, Connection>) {
    tracing::info!("=== Database Connections ===");
    for (key, connection) in connections {
        tracing::info!(
            "{}: backend={} address={} name={} user={} enabled={}",
            key,
            connection.backend,
            connection.address,
            connection.name,
            connection.user,
            connection.enabled
        );
    }
    tracing::info!("============================");
}
