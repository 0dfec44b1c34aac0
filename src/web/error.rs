//! 统一错误码
//!
//! [`ErrorCode`] 把业务码、HTTP 状态和展示消息绑成一个值类型，
//! 进程启动时定义为具名常量，按请求用 builder 派生特化副本。
//! 底层 cause 只用于日志，永远不会序列化进响应。

use std::fmt;
use std::sync::{Arc, LazyLock};

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

use crate::web::response::error_response;

/// 单个字段的校验失败记录
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    /// 字段名
    pub field: String,
    /// 提交的原始值
    pub value: String,
    /// 未通过的规则（如 `required`、`uuid`、`max=64`）
    pub rule: String,
}

impl FieldFailure {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            rule: rule.into(),
        }
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}' with value '{}' failed rule '{}'",
            self.field, self.value, self.rule
        )
    }
}

/// 一次请求里聚合的全部字段校验失败
#[derive(Debug, Clone, PartialEq, Error)]
#[error("request validation failed on {} field(s)", .0.len())]
pub struct ValidationFailures(pub Vec<FieldFailure>);

impl ValidationFailures {
    pub fn new(failures: Vec<FieldFailure>) -> Self {
        Self(failures)
    }

    /// 只有一条失败记录的便捷构造
    pub fn single(
        field: impl Into<String>,
        value: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self(vec![FieldFailure::new(field, value, rule)])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldFailure> {
        self.0.iter()
    }
}

/// 1000/400 - 请求参数错误
pub static ERR_INVALID_REQUEST_PARAMS: LazyLock<ErrorCode> =
    LazyLock::new(|| ErrorCode::new(1000, StatusCode::BAD_REQUEST, "invalid request params"));

/// 9999/500 - 未归类的服务内部错误
pub static ERR_UNKNOWN_ERROR: LazyLock<ErrorCode> = LazyLock::new(|| {
    ErrorCode::new(
        9999,
        StatusCode::INTERNAL_SERVER_ERROR,
        "unknown server internal error",
    )
});

/// 业务错误码值类型
///
/// `code` 和 `status` 构造后不可变；所有 `with_*` 操作返回新副本，
/// 共享的具名常量永远不会被请求级特化改动。相等性只比较
/// code/status/message，cause 不参与。
#[derive(Debug, Clone)]
pub struct ErrorCode {
    code: i32,
    status: StatusCode,
    message: String,
    delimiter: String,
    cause: Option<Arc<anyhow::Error>>,
}

impl ErrorCode {
    /// 构造错误码，默认分隔符为单个空格
    pub fn new(code: i32, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
            delimiter: " ".to_string(),
            cause: None,
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 底层错误（仅供日志）
    pub fn source_error(&self) -> Option<&anyhow::Error> {
        self.cause.as_deref()
    }

    /// 返回替换了消息的副本
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// 返回在原消息后追加内容的副本，使用当前分隔符拼接
    pub fn append_message(mut self, message: impl AsRef<str>) -> Self {
        self.message = format!("{}{}{}", self.message, self.delimiter, message.as_ref());
        self
    }

    /// 返回替换了分隔符的副本
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// 返回携带底层错误的副本
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(Arc::new(source.into()));
        self
    }
}

/// 只渲染消息本身，cause 通过 `source()` 暴露
impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorCode {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|err| &**err as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.status == other.status && self.message == other.message
    }
}

impl Eq for ErrorCode {}

/// 响应 body 固定为 code/httpStatus/message 三个字段
impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ErrorCode", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("httpStatus", &self.status.as_u16())?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

impl From<ValidationFailures> for ErrorCode {
    fn from(failures: ValidationFailures) -> Self {
        ERR_INVALID_REQUEST_PARAMS.clone().with_source(failures)
    }
}

/// 从任意 anyhow 错误归类
///
/// 内部如果包着 [`ErrorCode`] 或 [`ValidationFailures`] 则还原成
/// 对应错误码，否则落到未知错误。
impl From<anyhow::Error> for ErrorCode {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ErrorCode>() {
            Ok(code) => return code,
            Err(err) => err,
        };
        match err.downcast::<ValidationFailures>() {
            Ok(failures) => ErrorCode::from(failures),
            Err(err) => ERR_UNKNOWN_ERROR.clone().with_source(err),
        }
    }
}

impl IntoResponse for ErrorCode {
    fn into_response(self) -> Response {
        error_response(self)
    }
}
