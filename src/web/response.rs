//! 响应发射
//!
//! 所有 handler 的终点：成功路径写 JSON 数据，错误路径写错误码
//! body。发射错误响应的同时完成 cause 日志，handler 不需要自己记。

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use crate::constants;
use crate::web::error::{ErrorCode, ValidationFailures};

/// 成功响应
///
/// `data` 缺省时写出空对象 `{}`，保证响应永远是合法 JSON。
pub fn ok_response<T: Serialize>(status: StatusCode, data: Option<T>) -> Response {
    match data {
        Some(data) => (status, Json(data)).into_response(),
        None => (status, Json(serde_json::json!({}))).into_response(),
    }
}

/// 错误码响应
///
/// 先记录 cause；cause 自身还包着一层错误时两层都记。调试模式下
/// 校验失败会逐字段展开。最后把错误码按自己的状态写成 JSON body，
/// cause 不出现在响应里。
pub fn error_response(code: ErrorCode) -> Response {
    if let Some(cause) = code.source_error() {
        if constants::debug_enabled() {
            if let Some(failures) = cause.downcast_ref::<ValidationFailures>() {
                for failure in failures.iter() {
                    tracing::error!(
                        field = %failure.field,
                        value = %failure.value,
                        rule = %failure.rule,
                        "parameter validation error"
                    );
                }
            }
        }

        tracing::error!(
            code = code.code(),
            status = code.status().as_u16(),
            "request error: {}",
            cause
        );
        if let Some(underlying) = cause.chain().nth(1) {
            tracing::error!("underlying error: {}", underlying);
        }
    }

    let status = code.status();
    (status, Json(code)).into_response()
}

/// 自定义错误响应（body 不是错误码）
///
/// body 原样写出。缺省 `status` 是编码缺陷而不是运行时状况，
/// 直接 panic 而不是替调用方猜一个状态码。
pub fn custom_error_response<T: Serialize>(body: T, status: Option<StatusCode>) -> Response {
    let Some(status) = status else {
        panic!(
            "livingkit/usage: explicit http status is required when the body is not an ErrorCode"
        );
    };
    (status, Json(body)).into_response()
}
