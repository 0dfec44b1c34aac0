//! 固定间隔重试
//!
//! 对一个返回 `Result` 的异步操作做最多 N 次尝试，失败后等待固定
//! 间隔再试。成功立即返回，最后一次失败后不再等待。

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// 重试失败
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// 尝试次数参数不合法
    #[error("invalid param, retry attempts should be greater than 0")]
    InvalidAttempts,

    /// 全部尝试耗尽，携带最后一次的错误
    #[error("all {attempts} attempts failed: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },
}

/// 以固定间隔重试异步操作
///
/// `attempts` 是总尝试次数（含第一次），必须大于 0。每次失败会以
/// warn 级别记录，只有非最后一次失败才会等待 `delay`。
pub async fn retry<T, E, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    if attempts == 0 {
        return Err(RetryError::InvalidAttempts);
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= attempts {
                    return Err(RetryError::Exhausted {
                        attempts,
                        source: err,
                    });
                }
                tracing::warn!(
                    attempt,
                    attempts,
                    error = %err,
                    "operation failed, will retry after {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
