//! Livingkit - Web 服务基础组件库
//!
//! 为 HTTP 服务提供一套开箱即用的基础设施:
//!
//! Web 层 (web/):
//! - ErrorCode: 业务码 + HTTP 状态的错误值，直接序列化为响应体
//! - Response: ok_response / error_response 统一响应出口
//! - Recovery: panic 恢复，按载荷类型分类为对应错误响应
//! - DebugLog: 请求调试镜像（方法、路径、头部、解码后的数据）
//! - RouteCatalog: 路由目录与 /apis 自描述端点
//!
//! 外围能力:
//! - auth: Bearer token 提取与 JWT 校验
//! - client: 带调试转储的 HTTP 客户端封装
//! - config: 连接配置加载（文件 + 环境变量）
//! - db: 数据库连接池构造
//! - retry / subprocess / uuid: 通用工具

pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod db;
pub mod diagnostics;
pub mod logging;
pub mod retry;
pub mod subprocess;
pub mod uuid;
pub mod web;

pub use self::config::{load_connections, Connection};
pub use web::{ErrorCode, Server, ServerConfig, ValidationFailures};
