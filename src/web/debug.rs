//! 请求调试镜像
//!
//! 激活后把每个请求的方法、路径、客户端地址、头部和解码后的
//! 请求数据写进诊断通道。body 先缓冲再装回，下游 handler 照常
//! 读取；缓冲不下的请求直接以 413 拒绝。默认关闭，完全透传。

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, FromRequest, MatchedPath, Multipart, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{header, Method, StatusCode};
use serde_json::Value;

use crate::constants;
use crate::diagnostics::DiagnosticSink;

/// 镜像输出的分隔线宽度
const DELIMITER_WIDTH: usize = 50;

/// body 缓冲上限，与服务器默认 body 限制保持一致
const DEFAULT_MAX_BUFFER: usize = 50 * 1024 * 1024;

/// 调试镜像配置
#[derive(Clone)]
pub struct DebugLog {
    active: bool,
    sink: DiagnosticSink,
    max_buffer: usize,
}

impl DebugLog {
    /// 显式构造；`active` 为 false 时中间件完全透传
    pub fn new(active: bool, sink: DiagnosticSink) -> Self {
        Self {
            active,
            sink,
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }

    /// 按环境决定是否激活：全局调试开关与 DEBUG 日志级别双闸门，
    /// 两者都开才镜像。开关只在调用时求值一次，之后环境或日志级别
    /// 再变不跟随，应在日志初始化之后调用。
    pub fn from_env(sink: DiagnosticSink) -> Self {
        let active = constants::debug_enabled() && tracing::enabled!(tracing::Level::DEBUG);
        Self::new(active, sink)
    }

    /// 调整 body 缓冲上限，镜像激活时超限请求会被拒绝
    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// 请求调试镜像中间件
///
/// 解码策略：GET/DELETE 解查询参数；POST/PUT/PATCH 按内容类型解
/// JSON 或 multipart 表单，文件部分只记元信息。解码失败只记警告，
/// 请求继续往下走；body 超过缓冲上限则以 413 拒绝，不会以截断
/// 形态放行。
pub async fn debug_log_requests(
    State(debug): State<DebugLog>,
    matched_path: Option<MatchedPath>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if !debug.active {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();

    let path = matched_path
        .as_ref()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());
    let method = parts.method.clone();
    let client = client_address(&parts.headers, connect_info);
    let headers_text = format!("{:?}", parts.headers);

    let mut data = None;
    let request = if matches!(method, Method::GET | Method::DELETE) {
        data = decode_query(parts.uri.query());
        Request::from_parts(parts, body)
    } else if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
        match axum::body::to_bytes(body, debug.max_buffer).await {
            Ok(bytes) => {
                data = decode_body(&debug, &parts, &bytes).await;
                Request::from_parts(parts, Body::from(bytes))
            }
            Err(err) => {
                // 缓冲失败后拿不回完整 body，放行等于让 handler 读
                // 一个被截断的请求，只能整个拒绝
                tracing::warn!(error = %err, "unable to buffer request body for debug log");
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            }
        }
    } else {
        Request::from_parts(parts, body)
    };

    let delimiter = "=".repeat(DELIMITER_WIDTH);
    let rendered = data
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string());
    debug.sink.write_line(&format!(
        "{delimiter}\n[{path} - {method} - {client}] [{headers_text} - {rendered}]\n{delimiter}"
    ));

    next.run(request).await
}

/// 客户端地址：优先 X-Forwarded-For 首项，其次连接对端地址
fn client_address(
    headers: &header::HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// 查询参数解码，同名 key 聚合为数组
fn decode_query(query: Option<&str>) -> Option<Value> {
    let query = query?;
    if query.is_empty() {
        return None;
    }

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    Some(Value::Object(
        grouped
            .into_iter()
            .map(|(key, values)| (key, Value::from(values)))
            .collect(),
    ))
}

/// 按内容类型解码写方法的 body
async fn decode_body(
    debug: &DebugLog,
    parts: &http::request::Parts,
    bytes: &Bytes,
) -> Option<Value> {
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with(constants::APPLICATION_JSON) {
        match serde_json::from_slice(bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(error = %err, "unable to decode json request body");
                None
            }
        }
    } else if content_type.starts_with(constants::MULTIPART_FORM_DATA) {
        decode_multipart(debug, parts, bytes).await
    } else {
        None
    }
}

/// multipart 表单解码
///
/// 文本字段进 data；文件部分单独记一行名字/文件名/类型，
/// 文件字节永远不写进日志。
async fn decode_multipart(
    debug: &DebugLog,
    parts: &http::request::Parts,
    bytes: &Bytes,
) -> Option<Value> {
    // Parts 不可克隆，重建一份同头部的请求供 multipart 解析
    let mut builder = http::Request::builder()
        .method(parts.method.clone())
        .uri(parts.uri.clone());
    for (name, value) in &parts.headers {
        builder = builder.header(name, value);
    }
    let request = match builder.body(Body::from(bytes.clone())) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "unable to rebuild request for multipart decode");
            return None;
        }
    };

    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(err) => {
            tracing::warn!(error = %err, "unable to parse multipart form");
            return None;
        }
    };

    // 文本字段和查询参数一样按名聚合，同名字段收进同一个数组
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "unable to read multipart field");
                return None;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(ToString::to_string);
        let content_type = field.content_type().map(ToString::to_string);

        if let Some(file_name) = file_name {
            debug.sink.write_line(&format!(
                "[file part] name={name} filename={file_name} content_type={}",
                content_type.as_deref().unwrap_or("unknown")
            ));
        } else {
            match field.text().await {
                Ok(text) => fields.entry(name).or_default().push(text),
                Err(err) => {
                    tracing::warn!(error = %err, "unable to read multipart field text");
                    return None;
                }
            }
        }
    }

    Some(Value::Object(
        fields
            .into_iter()
            .map(|(key, values)| (key, Value::from(values)))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use axum::routing::{get, post};
    use axum::Router;
    use http::Request as HttpRequest;
    use tower::util::ServiceExt;

    async fn echo(body: String) -> String {
        body
    }

    async fn byte_len(body: Bytes) -> String {
        body.len().to_string()
    }

    fn mirror_router(debug: DebugLog) -> Router {
        Router::new()
            .route("/echo", post(echo))
            .route("/upload", post(byte_len))
            .route("/items", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(debug, debug_log_requests))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_inactive_mirror_is_a_passthrough() {
        let capture = MemorySink::new();
        let router = mirror_router(DebugLog::new(false, DiagnosticSink::new(capture.clone())));

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", constants::APPLICATION_JSON)
            .body(Body::from(r#"{"a":1}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        // body 原样到达 handler，诊断通道没有任何输出
        assert_eq!(body_text(response).await, r#"{"a":1}"#);
        assert!(capture.contents().is_empty());
    }

    #[test]
    fn test_from_env_is_evaluated_once_at_construction() {
        let _env = constants::env_lock();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::sink)
            .finish();

        let debug = tracing::subscriber::with_default(subscriber, || {
            std::env::set_var(constants::LIVINGKIT_DEBUG, "1");
            let debug = DebugLog::from_env(DiagnosticSink::new(MemorySink::new()));
            std::env::remove_var(constants::LIVINGKIT_DEBUG);
            debug
        });

        // 构造时两道闸门都开即激活，之后开关回落不影响既有实例
        assert!(debug.is_active());
        assert!(!DebugLog::from_env(DiagnosticSink::new(MemorySink::new())).is_active());
    }

    #[tokio::test]
    async fn test_active_mirror_logs_json_and_preserves_body() {
        let capture = MemorySink::new();
        let router = mirror_router(DebugLog::new(true, DiagnosticSink::new(capture.clone())));

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", constants::APPLICATION_JSON)
            .body(Body::from(r#"{"a":1}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(body_text(response).await, r#"{"a":1}"#);

        let mirrored = capture.contents();
        assert!(mirrored.contains(&"=".repeat(DELIMITER_WIDTH)));
        assert!(mirrored.contains("/echo - POST"));
        assert!(mirrored.contains(r#""a":1"#));
    }

    #[tokio::test]
    async fn test_query_parameters_are_decoded_for_get() {
        let capture = MemorySink::new();
        let router = mirror_router(DebugLog::new(true, DiagnosticSink::new(capture.clone())));

        let request = HttpRequest::builder()
            .uri("/items?page=2&tag=a&tag=b")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(body_text(response).await, "ok");

        let mirrored = capture.contents();
        assert!(mirrored.contains(r#""page":["2"]"#));
        assert!(mirrored.contains(r#""tag":["a","b"]"#));
    }

    #[tokio::test]
    async fn test_undecodable_body_degrades_gracefully() {
        let capture = MemorySink::new();
        let router = mirror_router(DebugLog::new(true, DiagnosticSink::new(capture.clone())));

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", constants::APPLICATION_JSON)
            .body(Body::from("not json at all"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        // 请求正常到达 handler，镜像里 data 一栏是占位符
        assert_eq!(body_text(response).await, "not json at all");
        assert!(capture.contents().contains("- -]"));
    }

    #[tokio::test]
    async fn test_body_over_buffer_cap_is_rejected_not_truncated() {
        let capture = MemorySink::new();
        let debug = DebugLog::new(true, DiagnosticSink::new(capture.clone())).with_max_buffer(4);
        let router = mirror_router(debug);

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", constants::APPLICATION_JSON)
            .body(Body::from(r#"{"a":"0123456789"}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        // 缓冲不下的 body 不会以截断形态到达 handler，负载也不进日志
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_text(response).await, "");
        assert!(!capture.contents().contains("0123456789"));
    }

    #[tokio::test]
    async fn test_multipart_logs_fields_and_file_metadata_only() {
        let capture = MemorySink::new();
        let router = mirror_router(DebugLog::new(true, DiagnosticSink::new(capture.clone())));

        let boundary = "livingkit-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             hello\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"a.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             FILEBYTES\r\n\
             --{boundary}--\r\n"
        );
        let body_len = body.len();

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("{}; boundary={boundary}", constants::MULTIPART_FORM_DATA),
            )
            .body(Body::from(body))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        // 下游拿到完整 body
        assert_eq!(body_text(response).await, body_len.to_string());

        let mirrored = capture.contents();
        assert!(mirrored.contains(r#""title":["hello"]"#));
        assert!(mirrored.contains("[file part] name=file filename=a.bin"));
        // 文件内容绝不落日志
        assert!(!mirrored.contains("FILEBYTES"));
    }
}
