//! HTTP Middleware
//!
//! 错误状态日志与 URL 参数 UUID 校验

use axum::extract::{RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::uuid::is_valid_uuid;
use crate::web::error::{ValidationFailures, ERR_INVALID_REQUEST_PARAMS};

/// HTTP 状态码错误日志中间件
///
/// 拦截 HTTP 响应，状态码为 4xx 时记 warn，5xx 时记 error。
/// 业务错误的 cause 已在错误码写出时记录，这里只看最终状态。
pub async fn log_error_responses(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP client error"
        );
    }

    response
}

/// URL 参数 UUID 校验中间件
///
/// 以 `from_fn_with_state("param_name", require_uuid_param)` 挂在
/// 需要校验的路由上。参数缺失或不是合法 UUID 时直接以参数错误
/// 响应收尾，handler 不会执行。
pub async fn require_uuid_param(
    State(param): State<&'static str>,
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Response {
    let value = params
        .iter()
        .find(|(name, _)| *name == param)
        .map(|(_, value)| value);

    match value {
        Some(value) if is_valid_uuid(value) => next.run(request).await,
        Some(value) => {
            tracing::error!(param, value, "URL param is not a valid UUID");
            let failures = ValidationFailures::single(param, value, "uuid");
            ERR_INVALID_REQUEST_PARAMS
                .clone()
                .with_source(failures)
                .into_response()
        }
        None => {
            tracing::error!(param, "URL param is missing");
            let failures = ValidationFailures::single(param, "", "required");
            ERR_INVALID_REQUEST_PARAMS
                .clone()
                .with_source(failures)
                .into_response()
        }
    }
}
