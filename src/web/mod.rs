//! Web Layer - HTTP 服务端组件
//!
//! 错误码、统一响应、panic 恢复、请求调试镜像、路由目录与
//! 服务器装配。

pub mod debug;
pub mod error;
pub mod middleware;
pub mod recovery;
pub mod response;
pub mod routes;
pub mod server;

pub use debug::{debug_log_requests, DebugLog};
pub use error::{ErrorCode, FieldFailure, ValidationFailures};
pub use error::{ERR_INVALID_REQUEST_PARAMS, ERR_UNKNOWN_ERROR};
pub use middleware::{log_error_responses, require_uuid_param};
pub use recovery::catch_panic_layer;
pub use response::{custom_error_response, error_response, ok_response};
pub use routes::{RouteCatalog, RouteEntry, APIS_PATH};
pub use server::{Server, ServerConfig};
