//! HTTP Client - 带诊断转储的 reqwest 封装
//!
//! 固定 base 地址，提供 GET/DELETE（查询参数）与 POST/PUT/PATCH
//! （JSON / 表单 / 空）五个动词，统一的响应解码和错误映射。
//! 设置 `DEBUG_HTTPCLIENT` 后请求响应概要会写入诊断通道，
//! 再设置 `DEBUG_HTTPCLIENT_BODY` 则附带 body。

use std::fmt;
use std::time::Instant;

use http::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::constants;
use crate::diagnostics::DiagnosticSink;

/// 客户端错误
#[derive(Debug, Error)]
pub enum ClientError {
    /// base 地址不合法
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// 默认请求头不合法
    #[error("invalid default header: {0}")]
    InvalidHeader(String),

    /// 传输层或构建错误
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 服务端返回了业务错误响应
    #[error("server error response: {0}")]
    Server(ServerErrorBody),

    /// 响应 body 无法解码
    #[error("unable to decode response: {0}")]
    Decode(String),
}

/// 服务端错误响应的标准 body
#[derive(Debug, Clone, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub message: String,

    /// HTTP 状态码，由客户端回填
    #[serde(skip)]
    pub status: u16,
}

impl fmt::Display for ServerErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http status {}: {}", self.status, self.message)
    }
}

/// 请求负载
#[derive(Debug, Clone)]
pub enum Payload {
    /// 空 body，按 `text/plain` 发送
    Empty,
    /// JSON body
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` 表单
    Form(Vec<(String, String)>),
}

/// HTTP 客户端配置
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// 服务 base 地址，必须是 http/https
    pub address: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
    /// 附加在每个请求上的默认头
    pub headers: Vec<(String, String)>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            headers: Vec::new(),
        }
    }
}

impl HttpClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// 追加一个随每个请求发送的默认头（如认证头）
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// 绑定单个服务地址的 HTTP 客户端
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base: Url,
    sink: DiagnosticSink,
}

impl HttpClient {
    /// 构造客户端，校验 base 地址并设置默认请求头
    pub fn new(config: HttpClientConfig) -> Result<Self, ClientError> {
        let base = Url::parse(&config.address)
            .map_err(|e| ClientError::InvalidAddress(format!("unable to parse address: {e}")))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ClientError::InvalidAddress(format!(
                "only http/https scheme is supported, got '{}'",
                base.scheme()
            )));
        }
        if base.host_str().is_none() {
            return Err(ClientError::InvalidAddress(
                "no host found in address".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(name, value);
        }

        let inner = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner,
            base,
            sink: DiagnosticSink::stderr(),
        })
    }

    /// 替换诊断输出通道
    pub fn with_sink(mut self, sink: DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// GET 请求，`query` 追加到 URL 查询串
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ClientError> {
        self.send_read(Method::GET, path, query).await
    }

    /// DELETE 请求，`query` 追加到 URL 查询串
    pub async fn delete(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ClientError> {
        self.send_read(Method::DELETE, path, query).await
    }

    /// POST 请求
    pub async fn post(&self, path: &str, payload: Payload) -> Result<reqwest::Response, ClientError> {
        self.send_write(Method::POST, path, payload).await
    }

    /// PUT 请求
    pub async fn put(&self, path: &str, payload: Payload) -> Result<reqwest::Response, ClientError> {
        self.send_write(Method::PUT, path, payload).await
    }

    /// PATCH 请求
    pub async fn patch(
        &self,
        path: &str,
        payload: Payload,
    ) -> Result<reqwest::Response, ClientError> {
        self.send_write(Method::PATCH, path, payload).await
    }

    /// 响应是否落在 [200, 400) 区间
    pub fn is_ok(response: &reqwest::Response) -> bool {
        Self::status_ok(response.status())
    }

    /// 统一处理响应
    ///
    /// 成功区间解码为 `T`；其余状态解码标准错误 body 并携带
    /// 状态码返回 [`ClientError::Server`]，body 解不开也不丢状态码。
    pub async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if constants::env_flag(constants::DEBUG_HTTPCLIENT)
            && constants::env_flag(constants::DEBUG_HTTPCLIENT_BODY)
        {
            self.sink.write_line(&String::from_utf8_lossy(&bytes));
        }

        if Self::status_ok(status) {
            serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::Decode(format!("unable to decode success body: {e}")))
        } else {
            // 错误 body 不是标准形状时各字段取默认值，状态码照常回填
            let mut body: ServerErrorBody =
                serde_json::from_slice(&bytes).unwrap_or_else(|e| ServerErrorBody {
                    success: false,
                    message: format!("unable to decode error body: {e}"),
                    status: 0,
                });
            body.status = status.as_u16();
            Err(ClientError::Server(body))
        }
    }

    fn status_ok(status: reqwest::StatusCode) -> bool {
        (200..400).contains(&status.as_u16())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidAddress(format!("unable to resolve path '{path}': {e}")))
    }

    async fn send_read(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint(path)?;
        let mut builder = self.inner.request(method, url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.dispatch(builder).await
    }

    async fn send_write(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint(path)?;
        let builder = self.inner.request(method, url);
        let builder = match payload {
            Payload::Empty => builder.header(CONTENT_TYPE, constants::TEXT_PLAIN),
            Payload::Json(value) => builder.json(&value),
            Payload::Form(pairs) => builder.form(&pairs),
        };
        self.dispatch(builder).await
    }

    async fn dispatch(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let request = builder.build()?;
        self.dump_request(&request);

        let started = Instant::now();
        let response = self.inner.execute(request).await?;
        tracing::debug!(elapsed = ?started.elapsed(), "request elapsed time");

        self.dump_response_head(&response);
        Ok(response)
    }

    /// 转储请求概要；body 只在 `DEBUG_HTTPCLIENT_BODY` 开启时输出
    fn dump_request(&self, request: &reqwest::Request) {
        if !constants::env_flag(constants::DEBUG_HTTPCLIENT) {
            return;
        }

        let mut text = format!(
            "{}\n{} {} {:?}",
            ">".repeat(100),
            request.method(),
            request.url(),
            request.version()
        );
        for (name, value) in request.headers() {
            text.push_str(&format!("\n{}: {}", name, value.to_str().unwrap_or("<binary>")));
        }
        if constants::env_flag(constants::DEBUG_HTTPCLIENT_BODY) {
            if let Some(bytes) = request.body().and_then(|b| b.as_bytes()) {
                text.push_str("\n\n");
                text.push_str(&String::from_utf8_lossy(bytes));
            }
        }
        self.sink.write_line(&text);
    }

    /// 转储响应状态行与头部；body 在 [`handle_response`] 读取后输出
    ///
    /// [`handle_response`]: HttpClient::handle_response
    fn dump_response_head(&self, response: &reqwest::Response) {
        if !constants::env_flag(constants::DEBUG_HTTPCLIENT) {
            return;
        }

        let mut text = format!(
            "{}\n{:?} {}",
            "<".repeat(100),
            response.version(),
            response.status()
        );
        for (name, value) in response.headers() {
            text.push_str(&format!("\n{}: {}", name, value.to_str().unwrap_or("<binary>")));
        }
        self.sink.write_line(&text);
    }
}
