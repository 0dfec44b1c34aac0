//! Panic 恢复
//!
//! 最外层安全网：handler 里任何 panic 都在这里收口，归类成
//! 错误码后照常写出 JSON 响应，绝不让一次请求带崩整个服务。
//! 归类优先级：校验失败集合 → 预构建错误码 → 携带消息的错误 →
//! 其他值文本化。

use std::any::Any;

use axum::response::IntoResponse;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::diagnostics::DiagnosticSink;
use crate::web::error::{
    ErrorCode, ValidationFailures, ERR_INVALID_REQUEST_PARAMS, ERR_UNKNOWN_ERROR,
};

/// 构造最外层的 panic 捕获层
pub fn catch_panic_layer(sink: DiagnosticSink) -> CatchPanicLayer<PanicResponder> {
    CatchPanicLayer::custom(PanicResponder { sink })
}

/// 把 panic 负载归类为错误码
pub fn classify_panic(payload: Box<dyn Any + Send + 'static>) -> ErrorCode {
    let payload = match payload.downcast::<ValidationFailures>() {
        Ok(failures) => return ERR_INVALID_REQUEST_PARAMS.clone().with_source(*failures),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<ErrorCode>() {
        Ok(code) => return *code,
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<anyhow::Error>() {
        Ok(err) => return ErrorCode::from(*err),
        Err(payload) => payload,
    };

    let text = panic_text(payload.as_ref());
    ERR_UNKNOWN_ERROR
        .clone()
        .with_source(anyhow::anyhow!(text))
}

/// 提取 panic 负载的文本描述，供诊断输出
fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(failures) = payload.downcast_ref::<ValidationFailures>() {
        return failures.to_string();
    }
    if let Some(code) = payload.downcast_ref::<ErrorCode>() {
        return code.to_string();
    }
    if let Some(err) = payload.downcast_ref::<anyhow::Error>() {
        return format!("{err:#}");
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        return (*text).to_string();
    }
    "unhandled panic with non-printable payload".to_string()
}

/// CatchPanic 层的响应构造器
#[derive(Clone)]
pub struct PanicResponder {
    sink: DiagnosticSink,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        // 原始负载先进诊断通道，归类放在之后
        let text = panic_text(err.as_ref());
        self.sink.write_line(&format!("[panic recovered] {text}"));
        tracing::error!("handler panicked: {}", text);

        classify_panic(err).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use axum::body::Body;
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;
    use http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn boxed<T: Send + 'static>(value: T) -> Box<dyn Any + Send + 'static> {
        Box::new(value)
    }

    #[test]
    fn test_classify_validation_failures() {
        let failures = ValidationFailures::single("user_id", "abc", "uuid");
        let code = classify_panic(boxed(failures.clone()));

        assert_eq!(code, *ERR_INVALID_REQUEST_PARAMS);
        let cause = code.source_error().unwrap();
        assert_eq!(cause.downcast_ref::<ValidationFailures>(), Some(&failures));
    }

    #[test]
    fn test_classify_prebuilt_error_code_passes_through() {
        let domain = ErrorCode::new(2002, StatusCode::CONFLICT, "duplicate record");
        assert_eq!(classify_panic(boxed(domain.clone())), domain);
    }

    #[test]
    fn test_classify_string_payload_becomes_unknown() {
        let code = classify_panic(boxed("boom".to_string()));
        assert_eq!(code, *ERR_UNKNOWN_ERROR);
        assert!(code.source_error().unwrap().to_string().contains("boom"));
    }

    #[test]
    fn test_classify_opaque_payload_becomes_unknown() {
        let code = classify_panic(boxed(42_u32));
        assert_eq!(code, *ERR_UNKNOWN_ERROR);
        assert!(code
            .source_error()
            .unwrap()
            .to_string()
            .contains("non-printable"));
    }

    async fn boom() -> Response {
        panic!("boom")
    }

    async fn raise_code() -> Response {
        std::panic::panic_any(ErrorCode::new(
            2003,
            StatusCode::SERVICE_UNAVAILABLE,
            "backend offline",
        ))
    }

    async fn raise_failures() -> Response {
        std::panic::panic_any(ValidationFailures::single("age", "-1", "min=0"))
    }

    async fn request(router: Router, path: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn recovered_router(sink: DiagnosticSink) -> Router {
        Router::new()
            .route("/boom", get(boom))
            .route("/code", get(raise_code))
            .route("/failures", get(raise_failures))
            .layer(catch_panic_layer(sink))
    }

    #[tokio::test]
    async fn test_panic_message_becomes_unknown_error_response() {
        let capture = MemorySink::new();
        let router = recovered_router(DiagnosticSink::new(capture.clone()));

        let (status, body) = request(router, "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "code": 9999,
                "httpStatus": 500,
                "message": "unknown server internal error"
            })
        );
        assert!(capture.contents().contains("boom"));
    }

    #[tokio::test]
    async fn test_panic_with_error_code_uses_its_status() {
        let router = recovered_router(DiagnosticSink::new(MemorySink::new()));

        let (status, body) = request(router, "/code").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body,
            json!({
                "code": 2003,
                "httpStatus": 503,
                "message": "backend offline"
            })
        );
    }

    #[tokio::test]
    async fn test_panic_with_validation_failures_maps_to_invalid_params() {
        let router = recovered_router(DiagnosticSink::new(MemorySink::new()));

        let (status, body) = request(router, "/failures").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "code": 1000,
                "httpStatus": 400,
                "message": "invalid request params"
            })
        );
    }
}
