//! Configuration Types
//!
//! 定义连接配置结构体

use std::collections::HashMap;

use serde::Deserialize;

/// 单个数据库连接配置
///
/// 一份配置文件可以声明多个命名连接，由各自的 key 区分。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Connection {
    /// 后端类型（如 `sqlite`、`postgres`、`mongodb`）
    #[serde(default)]
    pub backend: String,

    /// 服务器地址，`host` 或 `host:port`；sqlite 后端留空
    #[serde(default)]
    pub address: String,

    /// 数据库名；sqlite 后端是数据库文件路径
    #[serde(default)]
    pub name: String,

    /// 认证用户名
    #[serde(default)]
    pub user: String,

    /// 认证密码
    #[serde(default)]
    pub password: String,

    /// 是否启用该连接
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 透传给驱动的附加选项
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            backend: String::new(),
            address: String::new(),
            name: String::new(),
            user: String::new(),
            password: String::new(),
            enabled: true,
            options: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_connection_is_enabled() {
        let connection = Connection::default();
        assert!(connection.enabled);
        assert!(connection.backend.is_empty());
        assert!(connection.options.is_empty());
    }

    #[test]
    fn test_deserialize_minimal_connection() {
        let connection: Connection =
            serde_json::from_str(r#"{"backend": "sqlite", "name": "data/app.db"}"#).unwrap();
        assert_eq!(connection.backend, "sqlite");
        assert_eq!(connection.name, "data/app.db");
        assert!(connection.enabled);
        assert!(connection.user.is_empty());
    }
}
