//! HTTP Server
//!
//! Axum HTTP 服务器装配与启动

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::MethodRouter;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::diagnostics::DiagnosticSink;
use crate::web::debug::{debug_log_requests, DebugLog};
use crate::web::middleware::log_error_responses;
use crate::web::recovery::catch_panic_layer;
use crate::web::routes::{RouteCatalog, APIS_PATH};

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体大小上限（字节）
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5060,
            body_limit: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
///
/// 经 [`Server::route`] 注册的路由同时进入路由目录，`/apis` 端点
/// 对外展示全部已注册路由。[`Server::build`] 装配完整中间件栈，
/// 从内到外依次是：body 限制 → 调试镜像 → 错误状态日志 → trace
/// → CORS → panic 恢复（最外层安全网）。
pub struct Server {
    config: ServerConfig,
    catalog: RouteCatalog,
    router: Router,
    sink: DiagnosticSink,
    debug: Option<DebugLog>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            catalog: RouteCatalog::new(),
            router: Router::new(),
            sink: DiagnosticSink::stderr(),
            debug: None,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(ServerConfig::default())
    }

    /// 替换诊断通道（调试镜像与 panic 恢复共用）
    pub fn with_sink(mut self, sink: DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// 替换调试镜像配置；默认在装配时按环境决定。开关在装配时一次
    /// 定格，运行期调整日志级别不会翻转镜像；镜像的缓冲上限在装配
    /// 时统一对齐 `body_limit`。
    pub fn with_debug_log(mut self, debug: DebugLog) -> Self {
        self.debug = Some(debug);
        self
    }

    /// 注册一条路由并登记进目录
    ///
    /// `handler_name` 会出现在 `/apis` 的 `lastHandlerName` 字段里。
    pub fn route(
        mut self,
        method: Method,
        path: &str,
        handler_name: &str,
        endpoint: MethodRouter,
    ) -> Self {
        self.catalog.add(&method, path, handler_name);
        self.router = self.router.route(path, endpoint);
        self
    }

    /// 合并外部子路由（不进路由目录）
    pub fn merge(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// 装配最终 Router
    pub fn build(mut self) -> Router {
        // CORS 配置 - 允许所有来源的跨域请求
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .expose_headers(Any)
            .max_age(std::time::Duration::from_secs(3600));

        // /apis 端点自己也出现在目录里
        self.catalog.add(&Method::GET, APIS_PATH, "list_apis");

        // 镜像缓冲上限对齐 body 限制，服务器会收的 body 镜像都缓冲得下
        let debug = self
            .debug
            .unwrap_or_else(|| DebugLog::from_env(self.sink.clone()))
            .with_max_buffer(self.config.body_limit);

        self.router
            .merge(self.catalog.into_router())
            .layer(DefaultBodyLimit::max(self.config.body_limit))
            .layer(middleware::from_fn_with_state(debug, debug_log_requests))
            .layer(middleware::from_fn(log_error_responses))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(catch_panic_layer(self.sink))
    }

    /// 启动服务器
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self.config.addr();
        let router = self.build();

        info!("Starting HTTP server on {}", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr();
        let router = self.build();

        info!("Starting HTTP server on {} (with graceful shutdown)", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await?;

        Ok(())
    }
}
