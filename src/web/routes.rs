//! 路由目录
//!
//! axum 的 Router 构建后无法反查已注册的路由，目录在注册时收集，
//! 由 `/apis` 端点对外展示。占位符路径统一重写成 `{name}` 风格。

use std::sync::{Arc, LazyLock};

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use http::{Method, StatusCode};
use regex::Regex;
use serde::Serialize;

use crate::web::response::ok_response;

/// 路由目录端点路径
pub const APIS_PATH: &str = "/apis";

/// 匹配 `/api/:uuid`、`/api/:uuid/article/:id`、`/api/v1/*path` 里的占位符
static PATH_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^/.*)([:|*](\w+))(.*)").expect("path param regex"));

/// 一条已注册的路由
#[derive(Debug, Clone, Serialize)]
pub struct RouteEntry {
    pub path: String,
    pub method: String,
    #[serde(rename = "lastHandlerName")]
    pub handler: String,
}

/// 把 axum 风格的占位符路径重写为 `{name}` 风格
///
/// `/api/:uuid/article/:id` 变成 `/api/{uuid}/article/{id}`，
/// 通配符 `*path` 同样处理。
pub fn display_path(path: &str) -> String {
    let mut path = path.to_string();
    while PATH_PARAM_RE.is_match(&path) {
        path = PATH_PARAM_RE.replace(&path, "${1}{${3}}${4}").into_owned();
    }
    path
}

/// 注册时填充的路由目录
#[derive(Debug, Clone, Default)]
pub struct RouteCatalog {
    entries: Vec<RouteEntry>,
}

impl RouteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一条路由，path 保留注册时的原始写法
    pub fn add(&mut self, method: &Method, path: &str, handler: &str) {
        self.entries.push(RouteEntry {
            path: path.to_string(),
            method: method.to_string(),
            handler: handler.to_string(),
        });
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// 生成挂有 `/apis` 端点的子路由，展示用路径在此一次性重写
    pub fn into_router(self) -> Router {
        let entries: Vec<RouteEntry> = self
            .entries
            .into_iter()
            .map(|entry| RouteEntry {
                path: display_path(&entry.path),
                ..entry
            })
            .collect();

        Router::new()
            .route(APIS_PATH, get(list_apis))
            .with_state(Arc::new(entries))
    }
}

async fn list_apis(State(entries): State<Arc<Vec<RouteEntry>>>) -> Response {
    ok_response(
        StatusCode::OK,
        Some(serde_json::json!({ "apis": &*entries })),
    )
}
