//! Configuration Module
//!
//! 提供数据库连接配置管理，支持多层级配置来源：
//! - 环境变量（最高优先级）
//! - 配置文件（TOML 格式）
//! - 字段默认值（最低优先级）

mod loader;
mod types;

pub use loader::{
    load_connections, load_connections_from_path, print_connections, ConfigError,
};
pub use types::Connection;
