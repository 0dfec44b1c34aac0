//! 鉴权辅助 - Bearer 令牌提取与 JWT 校验
//!
//! [`BearerExtractor`] 只负责从请求头里取出令牌文本，
//! [`TokenVerifier`] 负责用 HS256 校验签名与标准声明。
//! 两者拆开，方便只做转发不做校验的网关场景。

use http::header::{HeaderMap, HeaderName, AUTHORIZATION};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// 鉴权失败
#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    /// 请求头缺失
    #[error("authorization header is missing")]
    MissingAuthorization,

    /// 头部值不是期望的 scheme
    #[error("token scheme is not the registered type: {expected}")]
    InvalidScheme { expected: String },

    /// 令牌本身无效（签名、过期、声明不符）
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// 从请求头中提取 Bearer 令牌
///
/// 默认读取 `Authorization` 头、匹配 `Bearer` scheme，
/// 两者都可以替换。
#[derive(Debug, Clone)]
pub struct BearerExtractor {
    header: HeaderName,
    scheme: String,
}

impl Default for BearerExtractor {
    fn default() -> Self {
        Self {
            header: AUTHORIZATION,
            scheme: "Bearer".to_string(),
        }
    }
}

impl BearerExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 改用其他请求头（如 `X-Api-Token`）
    pub fn with_header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }

    /// 改用其他 scheme（如 `Token`）
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// 提取令牌文本
    ///
    /// 头部缺失、scheme 不匹配都是错误；返回值已去掉 scheme
    /// 前缀并修剪空白。
    pub fn extract(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let value = headers
            .get(&self.header)
            .ok_or(AuthError::MissingAuthorization)?
            .to_str()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let token = value
            .strip_prefix(self.scheme.as_str())
            .and_then(|rest| rest.strip_prefix(' '))
            .ok_or_else(|| AuthError::InvalidScheme {
                expected: self.scheme.clone(),
            })?;

        Ok(token.trim().to_string())
    }
}

/// HS256 JWT 校验器
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// 以共享密钥构造校验器，默认校验 `exp`
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// 要求 `iss` 声明等于给定值
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// 要求 `aud` 声明包含给定值
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self
    }

    /// 校验令牌并反序列化声明
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, AuthError> {
        let data = decode::<C>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }
}
