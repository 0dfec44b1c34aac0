//! 日志初始化
//!
//! 统一初始化 tracing 订阅器。过滤规则优先取 `RUST_LOG`，
//! 否则落到调用方给的默认级别。

use tracing_subscriber::EnvFilter;

/// 初始化全局 tracing 订阅器
///
/// `default_level` 形如 `"info"` 或 `"livingkit=debug,tower_http=info"`，
/// 为 `None` 时使用 `info`。重复初始化会返回错误。
pub fn init_tracing(default_level: Option<&str>) -> anyhow::Result<()> {
    let fallback = default_level.unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!("unable to install tracing subscriber: {err}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        // 第一次初始化可能已被其他测试完成，结果不做断言
        let _ = init_tracing(Some("debug"));
        assert!(init_tracing(Some("debug")).is_err());
    }
}
